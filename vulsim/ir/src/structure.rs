//! Validated representation of bundles and combines.
use crate::Type;
use vulsim_utils::{GetName, Id};

/// A member of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMember {
    pub name: Id,
    pub ty: Type,
    /// Literal default. Only primitive members carry one; when the descriptor
    /// gives none it is `0`.
    pub default: Option<String>,
}

/// A composite value type usable as a field, port element or argument type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: Id,
    pub members: Vec<BundleMember>,
}

impl Bundle {
    /// Names of the types this bundle embeds by value.
    pub fn dependencies(&self) -> impl Iterator<Item = (Id, Id)> + '_ {
        self.members
            .iter()
            .filter_map(|m| m.ty.composite().map(|ty| (m.name, ty)))
    }
}

impl GetName for Bundle {
    fn name(&self) -> Id {
        self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `pipein`: `can_pop`, `top`, `pop`.
    Input,
    /// `pipeout`: `can_push`, `push`.
    Output,
}

/// A pipe port of a combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: Id,
    pub direction: Direction,
    pub ty: Type,
    pub comment: String,
}

/// An argument or a returned value of a call binding or owned function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: Type,
    pub name: Id,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Param>,
    /// Returned by pointer, after the parameters.
    pub returns: Vec<Param>,
}

/// A `request`: an operation implemented outside of the combine and bound
/// when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallBinding {
    pub name: Id,
    pub signature: Signature,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Part of the combine's call surface.
    Service,
    /// Internal helper.
    Function,
}

/// An operation the combine implements itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFunction {
    pub kind: FunctionKind,
    pub name: Id,
    pub signature: Signature,
    pub comment: String,
    pub body: CodeBlock,
}

/// Persistent state of a combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageField {
    /// Keeps its value across cycles until logic mutates it.
    Plain {
        name: Id,
        ty: Type,
        default: Option<String>,
        comment: String,
    },
    /// Exposes the committed value and accepts prioritized proposals that are
    /// committed at applytick.
    NextBuffered {
        name: Id,
        ty: Type,
        default: Option<String>,
        comment: String,
    },
    /// Reset to `default` at every applytick.
    TickReset {
        name: Id,
        ty: crate::Primitive,
        default: String,
        comment: String,
    },
}

impl GetName for StorageField {
    fn name(&self) -> Id {
        match self {
            StorageField::Plain { name, .. }
            | StorageField::NextBuffered { name, .. }
            | StorageField::TickReset { name, .. } => *name,
        }
    }
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigConstant {
    pub name: Id,
    pub value: String,
    pub comment: String,
}

/// Opaque source lines copied verbatim into the generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    lines: Vec<String>,
}

impl CodeBlock {
    /// Append every line of `text`.
    pub fn push_text(&mut self, text: &str) {
        self.lines.extend(text.lines().map(str::to_string));
    }

    pub fn extend(&mut self, other: CodeBlock) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// A simulation module compiled into a two-phase update unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combine {
    pub name: Id,
    pub comment: String,
    /// Input ports followed by output ports.
    pub ports: Vec<Port>,
    pub requests: Vec<CallBinding>,
    /// Services followed by internal functions.
    pub functions: Vec<OwnedFunction>,
    /// Plain, then next-buffered, then tick-reset fields.
    pub storage: Vec<StorageField>,
    pub configs: Vec<ConfigConstant>,
    /// Appended to the constructor after the injected dependencies.
    pub init: CodeBlock,
    pub tick: CodeBlock,
    pub applytick: CodeBlock,
    pub stallable: bool,
}

impl Combine {
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == Direction::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
    }

    /// Every name declared in the combine's namespace, in declaration order.
    pub fn declared_names(&self) -> impl Iterator<Item = Id> + '_ {
        self.ports
            .iter()
            .map(|p| p.name)
            .chain(self.requests.iter().map(|r| r.name))
            .chain(self.functions.iter().map(|f| f.name))
            .chain(self.storage.iter().map(|s| s.name()))
            .chain(self.configs.iter().map(|c| c.name))
    }

    /// Accessors and handles the generated class declares for its members,
    /// each paired with the member it is generated for.
    pub fn generated_names(&self) -> Vec<(Id, Id)> {
        let mut names = Vec::new();
        let mut add = |owner: Id, generated: String| {
            names.push((Id::new(generated), owner))
        };
        for port in &self.ports {
            let p = port.name;
            match port.direction {
                Direction::Input => {
                    add(p, format!("_pipein_{p}"));
                    add(p, format!("{p}_can_pop"));
                    add(p, format!("{p}_top"));
                    add(p, format!("{p}_pop"));
                }
                Direction::Output => {
                    add(p, format!("_pipeout_{p}"));
                    add(p, format!("{p}_can_push"));
                    add(p, format!("{p}_push"));
                }
            }
        }
        for req in &self.requests {
            add(req.name, format!("_request_{}", req.name));
        }
        for field in &self.storage {
            if let StorageField::NextBuffered { name, .. } = field {
                add(*name, format!("_storagenext_{name}"));
                add(*name, format!("{name}_get"));
                add(*name, format!("{name}_setnext"));
            }
        }
        names
    }
}

impl GetName for Combine {
    fn name(&self) -> Id {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::CodeBlock;

    #[test]
    fn code_block_splits_fragments_into_lines() {
        let mut block = CodeBlock::default();
        block.push_text("a = 1;");
        block.push_text("if (x) {\n    b();\n}");
        assert_eq!(
            block.lines(),
            &["a = 1;", "if (x) {", "    b();", "}"].map(String::from)
        );
    }
}
