//! C++ backend for the VulSim compiler.
//!
//! Emits `bundle.h` with every bundle in declaration order, and a header and
//! an implementation file per combine. A combine becomes a class whose
//! dependencies (pipe ports, requests, the external stall callback) are
//! injected through its `ConstructorArguments`, and whose two lifecycle
//! phases are `all_current_tick` and `all_current_applytick`.
use crate::traits::{Backend, OutputUnit};
use itertools::Itertools;
use std::fmt::Write;
use std::time::Instant;
use vulsim_ir::{
    self as ir, CommitAction, Direction, LifecyclePlan, StorageField, Type,
};
use vulsim_utils::{Error, GetName, Id, VulResult};

/// Names that cannot be used as identifiers in the generated code.
const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor",
    "bool", "break", "case", "catch", "char", "char8_t", "char16_t",
    "char32_t", "class", "co_await", "co_return", "co_yield", "compl",
    "concept", "const", "const_cast", "consteval", "constexpr", "constinit",
    "continue", "decltype", "default", "delete", "do", "double",
    "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false",
    "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
    "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof",
    "static", "static_assert", "static_cast", "struct", "switch", "template",
    "this", "thread_local", "throw", "true", "try", "typedef", "typeid",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
    "wchar_t", "while", "xor", "xor_eq",
];

/// Support headers every generated unit includes.
const INCLUDES: &[&str] = &["common.h", "global.h"];
const COMBINE_INCLUDES: &[&str] = &["bundle.h", "vulsimlib.h"];

#[derive(Default)]
pub struct CppBackend;

fn check_ident(name: Id) -> VulResult<()> {
    if CPP_KEYWORDS.contains(&name.as_ref()) {
        return Err(Error::reserved_name(name));
    }
    Ok(())
}

impl Backend for CppBackend {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn validate(ctx: &ir::Context) -> VulResult<()> {
        for bundle in ctx.bundles.values() {
            check_ident(bundle.name)?;
            for member in &bundle.members {
                check_ident(member.name)?;
            }
        }
        for combine in &ctx.combines {
            check_ident(combine.name)?;
            // The unit files of a combine share the output directory with
            // the support headers.
            let header = format!("{}.h", combine.name);
            if INCLUDES.iter().chain(COMBINE_INCLUDES).any(|h| *h == header) {
                return Err(Error::reserved_name(combine.name));
            }
            for name in combine.declared_names() {
                check_ident(name)?;
            }
            let params = combine
                .requests
                .iter()
                .map(|r| &r.signature)
                .chain(combine.functions.iter().map(|f| &f.signature))
                .flat_map(|sig| sig.params.iter().chain(&sig.returns));
            for param in params {
                check_ident(param.name)?;
            }
        }
        Ok(())
    }

    fn emit(ctx: &ir::Context) -> VulResult<Vec<OutputUnit>> {
        let emitter = Emitter::new(&ctx.bc);
        let mut units = Vec::with_capacity(1 + 2 * ctx.combines.len());
        units.push(OutputUnit {
            file_name: "bundle.h".to_string(),
            contents: emitter.bundle_header(ctx)?,
        });
        for combine in &ctx.combines {
            let time = Instant::now();
            units.push(OutputUnit {
                file_name: format!("{}.h", combine.name),
                contents: emitter.combine_header(combine)?,
            });
            units.push(OutputUnit {
                file_name: format!("{}.cpp", combine.name),
                contents: emitter.combine_source(combine)?,
            });
            log::info!(
                "Generated `{}` in {}ms",
                combine.name,
                time.elapsed().as_millis()
            );
        }
        Ok(units)
    }
}

/// Type used where a value is handed over: primitives by value, composites
/// by reference.
fn arg_type(ty: &Type) -> String {
    match ty {
        Type::Primitive(p) => p.to_string(),
        Type::Composite(name) => format!("{name} &"),
    }
}

/// Parameter list of a request or owned function. Returned values come
/// last, as pointers.
fn param_list(sig: &ir::Signature) -> String {
    let params = sig
        .params
        .iter()
        .map(|p| format!("{} {}", arg_type(&p.ty), p.name));
    let returns = sig.returns.iter().map(|p| format!("{} * {}", p.ty, p.name));
    params.chain(returns).join(", ")
}

fn doc_block(comment: &str, sig: &ir::Signature) -> Vec<String> {
    let mut lines = vec!["/*".to_string(), format!(" * {comment}")];
    for p in sig.params.iter().chain(&sig.returns) {
        let line = format!(" * @param {}: {}", p.name, p.comment);
        lines.push(line.trim_end().to_string());
    }
    lines.push(" */".to_string());
    lines
}

/// Pieces of a combine class, collected field by field before the class is
/// laid out.
#[derive(Default)]
struct ClassParts {
    ctor_args: Vec<String>,
    ctor: Vec<String>,
    members: Vec<String>,
}

impl ClassParts {
    fn port(&mut self, port: &ir::Port) {
        let (name, ty, c) = (port.name, port.ty, &port.comment);
        match port.direction {
            Direction::Input => {
                self.members.extend([
                    format!("PipeInputPort<{ty}> * _pipein_{name};"),
                    format!("/* {c} */"),
                    format!(
                        "bool {name}_can_pop() {{ return _pipein_{name}->can_pop(); }};"
                    ),
                    format!("/* {c} */"),
                    format!(
                        "{} {name}_top() {{ return _pipein_{name}->top(); }};",
                        arg_type(&ty)
                    ),
                    format!("/* {c} */"),
                    format!("void {name}_pop() {{ _pipein_{name}->pop(); }};"),
                ]);
                self.ctor_args
                    .push(format!("PipeInputPort<{ty}> * pipein_{name};"));
                self.ctor
                    .push(format!("this->_pipein_{name} = arg.pipein_{name};"));
            }
            Direction::Output => {
                self.members.extend([
                    format!("PipeOutputPort<{ty}> * _pipeout_{name};"),
                    format!("/* {c} */"),
                    format!(
                        "bool {name}_can_push() {{ return _pipeout_{name}->can_push(); }};"
                    ),
                    format!("/* {c} */"),
                    format!(
                        "void {name}_push({} value) {{ _pipeout_{name}->push(value); }};",
                        arg_type(&ty)
                    ),
                ]);
                self.ctor_args
                    .push(format!("PipeOutputPort<{ty}> * pipeout_{name};"));
                self.ctor.push(format!(
                    "this->_pipeout_{name} = arg.pipeout_{name};"
                ));
            }
        }
    }

    fn request(&mut self, req: &ir::CallBinding) {
        let name = req.name;
        let params = param_list(&req.signature);
        let forwarded = req
            .signature
            .params
            .iter()
            .chain(&req.signature.returns)
            .map(|p| p.name)
            .join(", ");
        self.members
            .push(format!("void (*_request_{name})({params});"));
        self.members.extend(doc_block(&req.comment, &req.signature));
        self.members.push(format!(
            "void {name}({params}) {{ _request_{name}({forwarded}); }};"
        ));
        self.ctor_args
            .push(format!("void (*request_{name})({params});"));
        self.ctor
            .push(format!("this->_request_{name} = arg.request_{name};"));
    }

    fn function(&mut self, func: &ir::OwnedFunction) {
        self.members.extend(doc_block(&func.comment, &func.signature));
        self.members.push(format!(
            "void {}({});",
            func.name,
            param_list(&func.signature)
        ));
    }

    fn storage(&mut self, field: &StorageField) {
        match field {
            StorageField::Plain {
                name,
                ty,
                default,
                comment,
            } => {
                self.members.push(format!("/* {comment} */"));
                self.members.push(match default {
                    Some(value) => format!("{ty} {name} = {value};"),
                    None => format!("{ty} {name};"),
                });
            }
            StorageField::NextBuffered {
                name,
                ty,
                default,
                comment,
            } => {
                self.members.push(match default {
                    Some(value) => format!(
                        "StorageNext<{ty}> _storagenext_{name} = StorageNext<{ty}>({value});"
                    ),
                    None => format!("StorageNext<{ty}> _storagenext_{name};"),
                });
                let arg = arg_type(ty);
                self.members.extend([
                    format!("/* {comment} */"),
                    format!(
                        "{arg} {name}_get() {{ return _storagenext_{name}.get(); }};"
                    ),
                    format!("/* {comment} */"),
                    format!(
                        "void {name}_setnext({arg} value, uint8 priority) {{ _storagenext_{name}.setnext(value, priority); }} ;"
                    ),
                ]);
            }
            StorageField::TickReset {
                name,
                ty,
                default,
                comment,
            } => {
                self.members.push(format!("/* {comment} */"));
                self.members.push(format!("{ty} {name} = {default};"));
            }
        }
    }

    fn config(&mut self, config: &ir::ConfigConstant) {
        self.members.push(format!("/* {} */", config.comment));
        self.members
            .push(format!("const int64 {} = {};", config.name, config.value));
    }

    fn stallable(&mut self) {
        self.members.extend(
            [
                "bool stalled = false;",
                "void (*_external_stall)();",
                "void stall() { stalled = true; _external_stall(); }",
            ]
            .map(String::from),
        );
        self.ctor_args.push("void (*external_stall)();".to_string());
        self.ctor
            .push("this->_external_stall = arg.external_stall;".to_string());
    }
}

fn commit_line(action: &CommitAction) -> String {
    match action {
        CommitAction::ApplyBuffered(name) => {
            format!("_storagenext_{name}.apply_tick();")
        }
        CommitAction::ResetTick { name, default, .. } => {
            format!("{name} = {default};")
        }
        CommitAction::ClearStall => "stalled = false;".to_string(),
    }
}

struct Emitter<'a> {
    tab: String,
    extra_includes: &'a [String],
}

impl<'a> Emitter<'a> {
    fn new(bc: &'a ir::BackendConf) -> Self {
        Self {
            tab: " ".repeat(bc.indent),
            extra_includes: &bc.extra_includes,
        }
    }

    fn includes(&self, f: &mut String, local: &[&str]) -> std::fmt::Result {
        for inc in INCLUDES.iter().chain(local) {
            writeln!(f, "#include \"{inc}\"")?;
        }
        for inc in self.extra_includes {
            writeln!(f, "#include \"{inc}\"")?;
        }
        Ok(())
    }

    fn bundle_header(&self, ctx: &ir::Context) -> VulResult<String> {
        let mut f = String::new();
        writeln!(f, "#pragma once")?;
        writeln!(f)?;
        self.includes(&mut f, &[])?;
        writeln!(f)?;
        for bundle in ctx.ordered_bundles() {
            writeln!(f, "typedef struct {{")?;
            for member in &bundle.members {
                match &member.default {
                    Some(value) => writeln!(
                        f,
                        "{}{} {} = {value};",
                        self.tab, member.ty, member.name
                    )?,
                    None => {
                        writeln!(f, "{}{} {};", self.tab, member.ty, member.name)?
                    }
                }
            }
            writeln!(f, "}} {};", bundle.name())?;
            writeln!(f)?;
        }
        Ok(f)
    }

    fn combine_header(&self, combine: &ir::Combine) -> VulResult<String> {
        let mut parts = ClassParts::default();
        combine.inputs().for_each(|p| parts.port(p));
        combine.outputs().for_each(|p| parts.port(p));
        combine.requests.iter().for_each(|r| parts.request(r));
        combine.functions.iter().for_each(|func| parts.function(func));
        combine.storage.iter().for_each(|s| parts.storage(s));
        combine.configs.iter().for_each(|c| parts.config(c));
        if combine.stallable {
            parts.stallable();
        }
        parts.ctor.extend(combine.init.lines().iter().cloned());

        let (t1, t2) = (&self.tab, self.tab.repeat(2));
        let name = combine.name;
        let mut f = String::new();
        writeln!(f, "#pragma once")?;
        writeln!(f)?;
        self.includes(&mut f, COMBINE_INCLUDES)?;
        writeln!(f)?;
        writeln!(f, "/* {} */", combine.comment)?;
        writeln!(f, "class {name} {{")?;
        writeln!(f, "public:")?;
        writeln!(f, "{t1}class ConstructorArguments {{")?;
        writeln!(f, "{t1}public:")?;
        for line in &parts.ctor_args {
            writeln!(f, "{t2}{line}")?;
        }
        writeln!(f, "{t2}int32 __dummy = 0;")?;
        writeln!(f, "{t1}}};")?;
        writeln!(f)?;
        writeln!(f, "{t1}{name}(ConstructorArguments & arg) {{")?;
        for line in &parts.ctor {
            writeln!(f, "{t2}{line}")?;
        }
        writeln!(f, "{t1}}}")?;
        writeln!(f)?;
        writeln!(f, "{t1}~{name}() {{")?;
        writeln!(f, "{t1}}}")?;
        writeln!(f)?;
        for method in ir::LIFECYCLE_NAMES {
            writeln!(f, "{t1}void {method}();")?;
        }
        writeln!(f)?;
        for line in &parts.members {
            writeln!(f, "{t1}{line}")?;
        }
        writeln!(f, "}};")?;
        Ok(f)
    }

    fn combine_source(&self, combine: &ir::Combine) -> VulResult<String> {
        let t1 = &self.tab;
        let name = combine.name;
        let mut f = String::new();
        writeln!(f, "#include \"{name}.h\"")?;
        writeln!(f)?;
        for func in &combine.functions {
            writeln!(
                f,
                "void {name}::{}({}) {{",
                func.name,
                param_list(&func.signature)
            )?;
            for line in func.body.lines() {
                writeln!(f, "{line}")?;
            }
            writeln!(f, "}}")?;
            writeln!(f)?;
        }

        let plan = LifecyclePlan::for_combine(combine);
        writeln!(f, "void {name}::all_current_tick() {{")?;
        writeln!(f, "{t1}user_current_tick();")?;
        writeln!(f, "}}")?;
        writeln!(f, "void {name}::all_current_applytick() {{")?;
        for action in &plan.commit {
            writeln!(f, "{t1}{}", commit_line(action))?;
        }
        writeln!(f, "{t1}user_current_applytick();")?;
        writeln!(f, "}}")?;
        for (method, block) in [
            ("user_current_tick", &combine.tick),
            ("user_current_applytick", &combine.applytick),
        ] {
            writeln!(f, "void {name}::{method}() {{")?;
            for line in block.lines() {
                writeln!(f, "{t1}{line}")?;
            }
            writeln!(f, "}}")?;
        }
        Ok(f)
    }
}
