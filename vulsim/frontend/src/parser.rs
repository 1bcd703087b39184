//! Parser for `bundle` and `combine` descriptor files.
use crate::ast::{
    ArgDef, BundleDef, CombineDef, ConfigDef, CppFuncDef, ExternalBody,
    FuncDef, MemberDef, PortDef, StorageDef,
};
use crate::xml::XmlNode;
use std::path::{Path, PathBuf};
use vulsim_utils::{Error, Id, VulResult};

/// Reads descriptor files into AST definitions.
pub struct DescriptorParser;

impl DescriptorParser {
    /// Parse a bundle descriptor file.
    pub fn parse_bundle_file(path: &Path) -> VulResult<BundleDef> {
        let src = Self::read(path)?;
        Self::parse_bundle_str(&src, path)
    }

    /// Parse a combine descriptor file.
    pub fn parse_combine_file(path: &Path) -> VulResult<CombineDef> {
        let src = Self::read(path)?;
        Self::parse_combine_str(&src, path)
    }

    fn read(path: &Path) -> VulResult<String> {
        std::fs::read_to_string(path).map_err(|err| {
            Error::invalid_file(format!(
                "Failed to read {}: {err}",
                path.display()
            ))
        })
    }

    /// Parse a bundle descriptor. `source` is only used for error reporting.
    pub fn parse_bundle_str(src: &str, source: &Path) -> VulResult<BundleDef> {
        let root = Self::root(src, "bundle", source)?;
        Self::bundle(&root, source).map_err(|e| e.with_file(source))
    }

    /// Parse a combine descriptor. `source` is only used for error reporting.
    pub fn parse_combine_str(
        src: &str,
        source: &Path,
    ) -> VulResult<CombineDef> {
        let root = Self::root(src, "combine", source)?;
        Self::combine(&root, source).map_err(|e| e.with_file(source))
    }

    fn root(src: &str, expected: &str, source: &Path) -> VulResult<XmlNode> {
        let root = XmlNode::parse_str(src).map_err(|e| e.with_file(source))?;
        if root.tag != expected {
            return Err(Error::schema(expected, &root.tag).with_file(source));
        }
        Ok(root)
    }

    fn bundle(root: &XmlNode, source: &Path) -> VulResult<BundleDef> {
        let name = Self::ident(root, "name", "bundle")?;
        log::info!("Loading bundle {name} from {}", source.display());
        let members = root
            .children_named("member")
            .map(|member| {
                Ok(MemberDef {
                    name: Self::ident(member, "name", "member")?,
                    ty: Self::required(member, "type", "member")?,
                    value: Self::value(member, "member")?,
                })
            })
            .collect::<VulResult<Vec<_>>>()?;
        Ok(BundleDef {
            name,
            members,
            source: source.to_path_buf(),
        })
    }

    fn combine(root: &XmlNode, source: &Path) -> VulResult<CombineDef> {
        let name = Self::ident(root, "name", "combine")?;
        log::info!("Loading combine {name} from {}", source.display());

        let mut def = CombineDef::new(name, source.to_path_buf());
        def.comment = Self::optional(root, "comment");
        for node in &root.children {
            log::debug!("parsing {} in combine {name}", node.tag);
            match node.tag.as_str() {
                "name" | "comment" => {}
                "pipein" => def.pipein.push(Self::port(node)?),
                "pipeout" => def.pipeout.push(Self::port(node)?),
                "request" => def.requests.push(Self::func(node, false)?),
                "service" => def.services.push(Self::func(node, true)?),
                "function" => def.functions.push(Self::func(node, true)?),
                "storage" => def.storage.push(Self::storage(node)?),
                "storagenext" => def.storagenext.push(Self::storage(node)?),
                "storagetick" => def.storagetick.push(Self::storage(node)?),
                "config" => def.configs.push(Self::config(node)?),
                "init" => def.init.push(Self::lifecycle(node)?),
                "tick" => def.tick.push(Self::lifecycle(node)?),
                "applytick" => def.applytick.push(Self::lifecycle(node)?),
                "stallable" => def.stallable = true,
                other => log::warn!(
                    "Ignoring unknown tag `{other}` in combine {name}"
                ),
            }
        }
        Ok(def)
    }

    fn port(node: &XmlNode) -> VulResult<PortDef> {
        Ok(PortDef {
            name: Self::ident(node, "name", &node.tag)?,
            ty: Self::required(node, "type", &node.tag)?,
            comment: Self::optional(node, "comment"),
        })
    }

    fn arg(node: &XmlNode) -> VulResult<ArgDef> {
        Ok(ArgDef {
            ty: Self::required(node, "type", &node.tag)?,
            name: Self::ident(node, "name", &node.tag)?,
            comment: Self::optional(node, "comment"),
        })
    }

    fn func(node: &XmlNode, has_body: bool) -> VulResult<FuncDef> {
        let name = Self::ident(node, "name", &node.tag)?;
        let body = if has_body {
            let cppfunc = node.child("cppfunc").ok_or_else(|| {
                Error::malformed_descriptor(format!(
                    "{} `{name}` has no `cppfunc`",
                    node.tag
                ))
            })?;
            Some(Self::cppfunc(cppfunc)?)
        } else {
            None
        };
        Ok(FuncDef {
            name,
            comment: Self::optional(node, "comment"),
            args: node
                .children_named("arg")
                .map(Self::arg)
                .collect::<VulResult<_>>()?,
            rets: node
                .children_named("return")
                .map(Self::arg)
                .collect::<VulResult<_>>()?,
            body,
        })
    }

    fn storage(node: &XmlNode) -> VulResult<StorageDef> {
        Ok(StorageDef {
            name: Self::ident(node, "name", &node.tag)?,
            ty: Self::required(node, "type", &node.tag)?,
            value: Self::value(node, &node.tag)?,
            comment: Self::optional(node, "comment"),
        })
    }

    fn config(node: &XmlNode) -> VulResult<ConfigDef> {
        Ok(ConfigDef {
            name: Self::ident(node, "name", "config")?,
            value: Self::required(node, "value", "config")?,
            comment: Self::optional(node, "comment"),
        })
    }

    /// `init`, `tick` and `applytick` wrap a single `cppfunc`.
    fn lifecycle(node: &XmlNode) -> VulResult<CppFuncDef> {
        let cppfunc = node.child("cppfunc").ok_or_else(|| {
            Error::malformed_descriptor(format!("`{}` has no `cppfunc`", node.tag))
        })?;
        Self::cppfunc(cppfunc)
    }

    fn cppfunc(node: &XmlNode) -> VulResult<CppFuncDef> {
        let file = Self::optional(node, "file");
        let func = Self::optional(node, "name");
        let external = match (file, func) {
            (Some(file), Some(func)) if !file.is_empty() && !func.is_empty() => {
                Some(ExternalBody {
                    file: PathBuf::from(file),
                    func: Id::new(func),
                })
            }
            (None, None) => None,
            _ => {
                return Err(Error::malformed_descriptor(
                    "`cppfunc` must name both a `file` and a function `name`",
                ));
            }
        };
        let code = node
            .children_named("code")
            .map(|c| c.trimmed_text().to_string())
            .collect();
        Ok(CppFuncDef { external, code })
    }

    /// Text of a required, non-empty child element.
    fn required(node: &XmlNode, tag: &str, parent: &str) -> VulResult<String> {
        match node.child(tag).map(XmlNode::trimmed_text) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            Some(_) => Err(Error::malformed_descriptor(format!(
                "`{parent}` has an empty `{tag}`"
            ))),
            None => Err(Error::malformed_descriptor(format!(
                "`{parent}` is missing required `{tag}`"
            ))),
        }
    }

    fn ident(node: &XmlNode, tag: &str, parent: &str) -> VulResult<Id> {
        let id = Id::new(Self::required(node, tag, parent)?);
        if !id.is_valid_ident() {
            return Err(Error::malformed_descriptor(format!(
                "`{id}` is not a valid identifier for a `{parent}` {tag}"
            )));
        }
        Ok(id)
    }

    /// Text of an optional child. Present-but-empty yields `Some("")`.
    fn optional(node: &XmlNode, tag: &str) -> Option<String> {
        node.child(tag).map(|c| c.trimmed_text().to_string())
    }

    /// A `value` child is optional, but when present it must hold a literal.
    fn value(node: &XmlNode, parent: &str) -> VulResult<Option<String>> {
        match node.child("value") {
            Some(_) => Self::required(node, "value", parent).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DescriptorParser;
    use std::path::Path;
    use vulsim_utils::ErrorKind;

    const ALU: &str = r#"
<combine>
    <name>Alu</name>
    <comment>Integer ALU</comment>
    <pipein><name>req</name><type>AluReq</type></pipein>
    <pipeout><name>resp</name><type>uint64</type><comment>result</comment></pipeout>
    <request>
        <name>read_reg</name>
        <arg><type>uint8</type><name>idx</name></arg>
        <return><type>uint64</type><name>value</name></return>
    </request>
    <service>
        <name>flush</name>
        <cppfunc><code>busy = false;</code></cppfunc>
    </service>
    <storage><name>busy</name><type>bool</type></storage>
    <storagenext><name>pc</name><type>uint64</type><value>0x80000000</value></storagenext>
    <storagetick><name>fire</name><type>bool</type></storagetick>
    <config><name>WIDTH</name><value>64</value></config>
    <tick><cppfunc><file>alu.cpp</file><name>alu_tick</name><code>fire = true;</code></cppfunc></tick>
    <stallable/>
</combine>"#;

    #[test]
    fn parses_every_combine_tag() {
        let def =
            DescriptorParser::parse_combine_str(ALU, Path::new("Alu.xml"))
                .unwrap();
        assert_eq!(def.name, "Alu");
        assert_eq!(def.comment.as_deref(), Some("Integer ALU"));
        assert_eq!(def.pipein.len(), 1);
        assert_eq!(def.pipein[0].comment, None);
        assert_eq!(def.pipeout[0].comment.as_deref(), Some("result"));
        assert_eq!(def.requests[0].args[0].name, "idx");
        assert_eq!(def.requests[0].rets[0].ty, "uint64");
        assert!(def.requests[0].body.is_none());
        assert_eq!(
            def.services[0].body.as_ref().unwrap().code,
            vec!["busy = false;".to_string()]
        );
        assert_eq!(def.storage[0].value, None);
        assert_eq!(def.storagenext[0].value.as_deref(), Some("0x80000000"));
        assert_eq!(def.configs[0].value, "64");
        let tick = &def.tick[0];
        let ext = tick.external.as_ref().unwrap();
        assert_eq!(ext.file, Path::new("alu.cpp"));
        assert_eq!(ext.func, "alu_tick");
        assert_eq!(tick.code, vec!["fire = true;".to_string()]);
        assert!(def.stallable);
    }

    #[test]
    fn parses_bundle_members_in_order() {
        let def = DescriptorParser::parse_bundle_str(
            r#"<bundle><name>Pkt</name>
                <member><name>x</name><type>int32</type><value>5</value></member>
                <member><name>y</name><type>BundleC</type></member>
            </bundle>"#,
            Path::new("Pkt.xml"),
        )
        .unwrap();
        assert_eq!(def.name, "Pkt");
        let names: Vec<_> = def.members.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(def.members[0].value.as_deref(), Some("5"));
        assert_eq!(def.members[1].value, None);
    }

    #[test]
    fn wrong_root_tag_is_a_schema_error() {
        let err = DescriptorParser::parse_bundle_str(
            "<combine><name>X</name></combine>",
            Path::new("X.xml"),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Schema { .. }));
        assert_eq!(err.file(), Some(Path::new("X.xml")));
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = DescriptorParser::parse_combine_str(
            "<combine><name>X</name><pipein><name>a</name></pipein></combine>",
            Path::new("X.xml"),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedDescriptor(_)));

        let err = DescriptorParser::parse_combine_str(
            "<combine><name>X</name><service><name>s</name></service></combine>",
            Path::new("X.xml"),
        )
        .unwrap_err();
        assert!(err.message().contains("cppfunc"));
    }

    #[test]
    fn empty_value_is_not_silently_defaulted() {
        let err = DescriptorParser::parse_combine_str(
            "<combine><name>X</name><storage><name>a</name><type>int8</type><value></value></storage></combine>",
            Path::new("X.xml"),
        )
        .unwrap_err();
        assert!(err.message().contains("empty `value`"));
    }

    #[test]
    fn cppfunc_file_requires_function_name() {
        let err = DescriptorParser::parse_combine_str(
            "<combine><name>X</name><init><cppfunc><file>a.cpp</file></cppfunc></init></combine>",
            Path::new("X.xml"),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedDescriptor(_)));
    }
}
