use super::{
    BackendConf, Bundle, BundleMember, CallBinding, CodeBlock, Combine,
    ConfigConstant, Context, Direction, FunctionKind, OwnedFunction, Param,
    Port, Signature, StorageField, Type,
};
use crate::reserved_names::{CLASS_NAMES, LIFECYCLE_NAMES, STALL_NAMES};
use linked_hash_map::LinkedHashMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use vulsim_frontend::{Workspace, ast, extract_function_body};
use vulsim_utils::{Diagnostics, Error, Id, VulResult, Warning};

/// Construct an IR representation from a parsed workspace.
///
/// Fatal errors abort the construction. Errors that only affect one combine
/// (see [Error::is_recoverable]) are recorded in the context's diagnostics
/// and the combine is left out of [Context::combines].
pub fn ast_to_ir(ws: Workspace, bc: BackendConf) -> VulResult<Context> {
    let mut diagnostics = Diagnostics::default();

    let mut bundles: LinkedHashMap<Id, Bundle> = LinkedHashMap::new();
    for def in &ws.bundles {
        if bundles.contains_key(&def.name) {
            return Err(Error::already_bound(def.name, "another bundle")
                .with_file(&def.source));
        }
        let bundle = build_bundle(def).map_err(|e| e.with_file(&def.source))?;
        bundles.insert(def.name, bundle);
    }

    let list: Vec<Bundle> = bundles.values().cloned().collect();
    let bundle_order = crate::bundle_order::resolve(&list, &mut diagnostics)?;

    let mut names: HashSet<Id> = HashSet::with_capacity(ws.combines.len());
    let mut combines = Vec::with_capacity(ws.combines.len());
    for def in &ws.combines {
        if !names.insert(def.name) {
            return Err(Error::already_bound(def.name, "another combine")
                .with_file(&def.source));
        }
        match build_combine(def, &ws.cpp_dir, &mut diagnostics) {
            Ok(combine) => {
                log::debug!(
                    "Combine `{}`: {} ports, {} functions, {} storage fields",
                    combine.name,
                    combine.ports.len(),
                    combine.functions.len(),
                    combine.storage.len()
                );
                combines.push(combine)
            }
            Err(err) if err.is_recoverable() => {
                diagnostics.error(err.with_file(&def.source))
            }
            Err(err) => return Err(err.with_file(&def.source)),
        }
    }

    Ok(Context {
        bundles,
        bundle_order,
        combines,
        bc,
        diagnostics,
    })
}

fn build_bundle(def: &ast::BundleDef) -> VulResult<Bundle> {
    let mut seen = HashSet::with_capacity(def.members.len());
    let members = def
        .members
        .iter()
        .map(|m| {
            if !seen.insert(m.name) {
                return Err(Error::already_bound(
                    m.name,
                    format!("another member of bundle `{}`", def.name),
                ));
            }
            let ty = Type::parse(&m.ty);
            let default = ty
                .is_primitive()
                .then(|| m.value.clone().unwrap_or_else(|| "0".to_string()));
            Ok(BundleMember {
                name: m.name,
                ty,
                default,
            })
        })
        .collect::<VulResult<_>>()?;
    Ok(Bundle {
        name: def.name,
        members,
    })
}

fn comment_or(comment: &Option<String>, default: impl FnOnce() -> String) -> String {
    comment.clone().unwrap_or_else(default)
}

fn build_params(args: &[ast::ArgDef]) -> Vec<Param> {
    args.iter()
        .map(|a| Param {
            ty: Type::parse(&a.ty),
            name: a.name,
            comment: a.comment.clone().unwrap_or_default(),
        })
        .collect()
}

fn build_signature(def: &ast::FuncDef) -> VulResult<Signature> {
    let sig = Signature {
        params: build_params(&def.args),
        returns: build_params(&def.rets),
    };
    let mut seen = HashSet::new();
    for param in sig.params.iter().chain(&sig.returns) {
        if !seen.insert(param.name) {
            return Err(Error::already_bound(
                param.name,
                format!("another parameter of `{}`", def.name),
            ));
        }
    }
    Ok(sig)
}

/// Assemble a code block: the extracted external body first, then the inline
/// fragments in document order.
fn build_body(
    combine: Id,
    owner: &str,
    def: &ast::CppFuncDef,
    cpp_dir: &Path,
) -> VulResult<CodeBlock> {
    let mut block = CodeBlock::default();
    if let Some(ext) = &def.external {
        let path = cpp_dir.join(&ext.file);
        match extract_function_body(&path, ext.func.as_ref())? {
            Some(body) => block.push_text(&body),
            None => {
                return Err(Error::body_not_found(
                    combine, owner, ext.func, path,
                ));
            }
        }
    }
    for code in &def.code {
        block.push_text(code);
    }
    Ok(block)
}

/// The first block of a lifecycle phase. Later ones are reported and
/// ignored.
fn first_block(
    combine: Id,
    phase: &'static str,
    defs: &[ast::CppFuncDef],
    cpp_dir: &Path,
    diag: &mut Diagnostics,
) -> VulResult<CodeBlock> {
    if defs.len() > 1 {
        diag.warn(Warning::DuplicateLifecycle { combine, phase });
    }
    match defs.first() {
        Some(def) => build_body(combine, phase, def, cpp_dir),
        None => Ok(CodeBlock::default()),
    }
}

fn build_storage(def: &ast::CombineDef) -> VulResult<Vec<StorageField>> {
    let plain = def.storage.iter().map(|s| -> VulResult<StorageField> {
        let ty = Type::parse(&s.ty);
        Ok(StorageField::Plain {
            name: s.name,
            default: s
                .value
                .clone()
                .or_else(|| ty.is_primitive().then(|| "0".to_string())),
            ty,
            comment: comment_or(&s.comment, || format!("Storage {}", s.name)),
        })
    });
    let next = def.storagenext.iter().map(|s| -> VulResult<StorageField> {
        Ok(StorageField::NextBuffered {
            name: s.name,
            ty: Type::parse(&s.ty),
            default: s.value.clone(),
            comment: comment_or(&s.comment, || format!("Storage {}", s.name)),
        })
    });
    let tick = def.storagetick.iter().map(|s| match Type::parse(&s.ty) {
        Type::Primitive(ty) => Ok(StorageField::TickReset {
            name: s.name,
            ty,
            default: s.value.clone().unwrap_or_else(|| "0".to_string()),
            comment: comment_or(&s.comment, || format!("Storage {}", s.name)),
        }),
        Type::Composite(ty) => Err(Error::malformed_descriptor(format!(
            "storagetick `{}` must have a primitive type, found `{ty}`",
            s.name
        ))),
    });
    plain.chain(next).chain(tick).collect()
}

/// Every declared name must be unique and must not shadow a name the
/// generated code declares itself, including the accessors generated for
/// other members.
fn check_namespace(combine: &Combine) -> VulResult<()> {
    let mut reserved: Vec<&str> =
        LIFECYCLE_NAMES.iter().chain(CLASS_NAMES).copied().collect();
    reserved.push(combine.name.as_ref());
    if combine.stallable {
        reserved.extend_from_slice(STALL_NAMES);
    }
    let mut seen = HashSet::new();
    for name in combine.declared_names() {
        if reserved.contains(&name.as_ref()) {
            return Err(Error::reserved_name(name));
        }
        if !seen.insert(name) {
            return Err(Error::already_bound(
                name,
                format!("another member of combine `{}`", combine.name),
            ));
        }
    }
    let mut generated: HashMap<Id, Id> = HashMap::new();
    for (name, owner) in combine.generated_names() {
        let clash = seen.contains(&name)
            || reserved.contains(&name.as_ref())
            || generated.insert(name, owner).is_some();
        if clash {
            return Err(Error::already_bound(
                name,
                format!(
                    "the accessors of `{owner}` in combine `{}`",
                    combine.name
                ),
            ));
        }
    }
    Ok(())
}

fn build_combine(
    def: &ast::CombineDef,
    cpp_dir: &Path,
    diag: &mut Diagnostics,
) -> VulResult<Combine> {
    let name = def.name;

    let inputs = def.pipein.iter().map(|p| Port {
        name: p.name,
        direction: Direction::Input,
        ty: Type::parse(&p.ty),
        comment: comment_or(&p.comment, || format!("Pipe input {}", p.name)),
    });
    let outputs = def.pipeout.iter().map(|p| Port {
        name: p.name,
        direction: Direction::Output,
        ty: Type::parse(&p.ty),
        comment: comment_or(&p.comment, || format!("Pipe output {}", p.name)),
    });
    let ports = inputs.chain(outputs).collect();

    let requests = def
        .requests
        .iter()
        .map(|r| {
            Ok(CallBinding {
                name: r.name,
                signature: build_signature(r)?,
                comment: comment_or(&r.comment, || format!("Request {}", r.name)),
            })
        })
        .collect::<VulResult<_>>()?;

    let services = def.services.iter().map(|f| (FunctionKind::Service, f));
    let helpers = def.functions.iter().map(|f| (FunctionKind::Function, f));
    let functions = services
        .chain(helpers)
        .map(|(kind, f)| {
            let label = match kind {
                FunctionKind::Service => "Service",
                FunctionKind::Function => "Function",
            };
            let body = match &f.body {
                Some(body) => build_body(
                    name,
                    &format!("{} `{}`", label.to_lowercase(), f.name),
                    body,
                    cpp_dir,
                )?,
                None => CodeBlock::default(),
            };
            Ok(OwnedFunction {
                kind,
                name: f.name,
                signature: build_signature(f)?,
                comment: comment_or(&f.comment, || format!("{label} {}", f.name)),
                body,
            })
        })
        .collect::<VulResult<_>>()?;

    let configs = def
        .configs
        .iter()
        .map(|c| ConfigConstant {
            name: c.name,
            value: c.value.clone(),
            comment: comment_or(&c.comment, || format!("Config {}", c.name)),
        })
        .collect();

    let mut init = CodeBlock::default();
    for block in &def.init {
        init.extend(build_body(name, "init", block, cpp_dir)?);
    }
    let tick = first_block(name, "tick", &def.tick, cpp_dir, diag)?;
    let applytick =
        first_block(name, "applytick", &def.applytick, cpp_dir, diag)?;

    let combine = Combine {
        name,
        comment: comment_or(&def.comment, || format!("Combine {name}")),
        ports,
        requests,
        functions,
        storage: build_storage(def)?,
        configs,
        init,
        tick,
        applytick,
        stallable: def.stallable,
    };
    check_namespace(&combine)?;
    Ok(combine)
}

#[cfg(test)]
mod tests {
    use super::ast_to_ir;
    use crate::{BackendConf, FunctionKind, StorageField};
    use std::fs;
    use std::path::Path;
    use vulsim_frontend::Workspace;
    use vulsim_utils::{ErrorKind, Warning};

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["bundle", "combine", "cpp"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
        }
        for (path, contents) in files {
            fs::write(dir.path().join(path), contents).unwrap();
        }
        dir
    }

    fn lower(root: &Path) -> vulsim_utils::VulResult<crate::Context> {
        ast_to_ir(Workspace::construct(root)?, BackendConf::default())
    }

    #[test]
    fn duplicate_tick_keeps_the_first_block() {
        let dir = project(&[(
            "combine/core.xml",
            r#"<combine><name>Core</name>
                <tick><cppfunc><code>first();</code></cppfunc></tick>
                <tick><cppfunc><code>second();</code></cppfunc></tick>
            </combine>"#,
        )]);
        let ctx = lower(dir.path()).unwrap();
        let core = ctx.find_combine("Core").unwrap();
        assert_eq!(core.tick.lines(), &["first();".to_string()]);
        assert_eq!(core.comment, "Combine Core");
        assert!(matches!(
            ctx.diagnostics.warnings(),
            [Warning::DuplicateLifecycle { phase: "tick", .. }]
        ));
    }

    #[test]
    fn extracted_body_precedes_inline_code() {
        let dir = project(&[
            (
                "cpp/core.cpp",
                "void core_reset(int a) {\n    a = 0;\n    b = 1;\n}\n",
            ),
            (
                "combine/core.xml",
                r#"<combine><name>Core</name>
                    <function><name>reset</name>
                        <cppfunc><file>core.cpp</file><name>core_reset</name>
                        <code>c = 2;</code></cppfunc>
                    </function>
                </combine>"#,
            ),
        ]);
        let ctx = lower(dir.path()).unwrap();
        let f = &ctx.find_combine("Core").unwrap().functions[0];
        assert_eq!(f.kind, FunctionKind::Function);
        assert_eq!(f.comment, "Function reset");
        assert_eq!(f.body.lines(), &["a = 0;", "    b = 1;", "c = 2;"]);
    }

    #[test]
    fn missing_body_skips_only_that_combine() {
        let dir = project(&[
            ("cpp/logic.cpp", "void other() {}\n"),
            (
                "combine/a.xml",
                r#"<combine><name>Broken</name>
                    <tick><cppfunc><file>logic.cpp</file><name>nope</name></cppfunc></tick>
                </combine>"#,
            ),
            ("combine/b.xml", "<combine><name>Fine</name></combine>"),
        ]);
        let ctx = lower(dir.path()).unwrap();
        assert!(ctx.find_combine("Broken").is_none());
        assert!(ctx.find_combine("Fine").is_some());
        let errors = ctx.diagnostics.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind(),
            ErrorKind::BodyNotFound { owner, .. } if owner == "tick"
        ));
    }

    #[test]
    fn storage_defaults() {
        let dir = project(&[(
            "combine/core.xml",
            r#"<combine><name>Core</name>
                <storage><name>count</name><type>uint32</type></storage>
                <storage><name>pkt</name><type>Packet</type></storage>
                <storagenext><name>pc</name><type>uint64</type><value>16</value></storagenext>
                <storagenext><name>npc</name><type>uint64</type></storagenext>
                <storagetick><name>fire</name><type>bool</type></storagetick>
            </combine>"#,
        )]);
        let ctx = lower(dir.path()).unwrap();
        let storage = &ctx.find_combine("Core").unwrap().storage;
        let defaults: Vec<Option<&str>> = storage
            .iter()
            .map(|s| match s {
                StorageField::Plain { default, .. }
                | StorageField::NextBuffered { default, .. } => {
                    default.as_deref()
                }
                StorageField::TickReset { default, .. } => {
                    Some(default.as_str())
                }
            })
            .collect();
        assert_eq!(defaults, vec![Some("0"), None, Some("16"), None, Some("0")]);
    }

    #[test]
    fn namespace_collisions_are_fatal() {
        let dir = project(&[(
            "combine/core.xml",
            r#"<combine><name>Core</name>
                <pipein><name>data</name><type>uint8</type></pipein>
                <storage><name>data</name><type>uint8</type></storage>
            </combine>"#,
        )]);
        let err = lower(dir.path()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyBound(..)));

        let dir = project(&[(
            "combine/core.xml",
            r#"<combine><name>Core</name><stallable/>
                <storage><name>stalled</name><type>bool</type></storage>
            </combine>"#,
        )]);
        let err = lower(dir.path()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ReservedName(..)));
    }

    #[test]
    fn generated_accessors_are_part_of_the_namespace() {
        for (members, clash) in [
            (
                "<pipein><name>req</name><type>uint8</type></pipein>
                 <storage><name>req_top</name><type>uint8</type></storage>",
                "req_top",
            ),
            (
                "<pipeout><name>out</name><type>uint8</type></pipeout>
                 <function><name>out_push</name><cppfunc><code>go();</code></cppfunc></function>",
                "out_push",
            ),
            (
                "<storagenext><name>pc</name><type>uint64</type></storagenext>
                 <config><name>pc_get</name><value>1</value></config>",
                "pc_get",
            ),
            (
                "<request><name>load</name></request>
                 <storage><name>_request_load</name><type>uint8</type></storage>",
                "_request_load",
            ),
        ] {
            let descriptor =
                format!("<combine><name>Core</name>{members}</combine>");
            let dir = project(&[("combine/core.xml", descriptor.as_str())]);
            let err = lower(dir.path()).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::AlreadyBound(name, _) if name == clash),
                "{clash} accepted"
            );
        }
    }

    #[test]
    fn class_scope_names_are_reserved() {
        for (stall, member) in [
            ("", "ConstructorArguments"),
            ("", "Core"),
            ("<stallable/>", "_external_stall"),
        ] {
            let descriptor = format!(
                "<combine><name>Core</name>{stall}<storage><name>{member}</name><type>uint8</type></storage></combine>"
            );
            let dir = project(&[("combine/core.xml", descriptor.as_str())]);
            let err = lower(dir.path()).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::ReservedName(..)), "{member}");
        }
    }

    #[test]
    fn storagetick_must_be_primitive() {
        let dir = project(&[(
            "combine/core.xml",
            r#"<combine><name>Core</name>
                <storagetick><name>p</name><type>Packet</type></storagetick>
            </combine>"#,
        )]);
        let err = lower(dir.path()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedDescriptor(_)));
    }

    #[test]
    fn duplicate_bundle_names_are_fatal() {
        let dir = project(&[
            ("bundle/a.xml", "<bundle><name>Pkt</name></bundle>"),
            ("bundle/b.xml", "<bundle><name>Pkt</name></bundle>"),
        ]);
        let err = lower(dir.path()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyBound(..)));
    }
}
