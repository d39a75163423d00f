use std::collections::BTreeSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ManifestError;
use crate::types::{
    ManifestInfo, ManifestStatus, PackageDescriptor, PackageType, Warning, WarningKind,
};

/// Client libraries whose presence marks a package as a node.
const NODE_DEPENDENCIES: &[&str] = &["roscpp", "rospy", "nodelet"];
/// Dependencies of packages that only generate message code.
const INTERFACE_DEPENDENCIES: &[&str] = &["message_generation", "message_runtime"];

#[derive(Default)]
struct ManifestBuilder {
    name: Option<String>,
    version: Option<String>,
    format: Option<u32>,
    build_depends: usize,
    exec_depends: usize,
    test_depends: usize,
    dependencies: BTreeSet<String>,
    metapackage: bool,
}

impl ManifestBuilder {
    fn root(&mut self, element: &BytesStart<'_>) {
        for attr in element.attributes().flatten() {
            if attr.key.as_ref() == b"format" {
                self.format = String::from_utf8_lossy(&attr.value).trim().parse().ok();
            }
        }
    }

    /// Record a closed element given its ancestors.
    fn element(&mut self, parents: &[String], name: &str, text: &str) {
        match parents {
            [root] if root == "package" => self.package_child(name, text),
            [root, export] if root == "package" && export == "export" => {
                if name == "metapackage" {
                    self.metapackage = true;
                }
            }
            _ => {}
        }
    }

    fn package_child(&mut self, name: &str, text: &str) {
        match name {
            "name" if !text.is_empty() => self.name = Some(text.to_string()),
            "version" if !text.is_empty() => self.version = Some(text.to_string()),
            _ if text.is_empty() => {}
            "depend" => {
                self.build_depends += 1;
                self.exec_depends += 1;
                self.dependencies.insert(text.to_string());
            }
            "build_depend" => {
                self.build_depends += 1;
                self.dependencies.insert(text.to_string());
            }
            "exec_depend" | "run_depend" => {
                self.exec_depends += 1;
                self.dependencies.insert(text.to_string());
            }
            "test_depend" => {
                self.test_depends += 1;
                self.dependencies.insert(text.to_string());
            }
            "build_export_depend" | "buildtool_depend" | "buildtool_export_depend"
            | "doc_depend" => {
                self.dependencies.insert(text.to_string());
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<ManifestInfo, ManifestError> {
        let name = self.name.ok_or(ManifestError::MissingName)?;
        let package_type = classify(self.metapackage, &self.dependencies);
        Ok(ManifestInfo {
            name,
            version: self.version,
            format: self.format,
            package_type,
            build_depends: self.build_depends,
            exec_depends: self.exec_depends,
            test_depends: self.test_depends,
            dependencies: self.dependencies,
            status: ManifestStatus::Parsed,
        })
    }
}

fn classify(metapackage: bool, dependencies: &BTreeSet<String>) -> PackageType {
    let has_any = |names: &[&str]| names.iter().any(|n| dependencies.contains(*n));
    if metapackage {
        PackageType::Metapackage
    } else if has_any(NODE_DEPENDENCIES) {
        PackageType::Node
    } else if has_any(INTERFACE_DEPENDENCIES) {
        PackageType::Interface
    } else {
        PackageType::Library
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Parse the contents of a `package.xml`.
pub fn parse_manifest(xml: &str) -> Result<ManifestInfo, ManifestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = ManifestBuilder::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut seen_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(ManifestError::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                })
            }
        };

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if stack.is_empty() {
                    if name != "package" {
                        return Err(ManifestError::UnexpectedRoot(name));
                    }
                    seen_root = true;
                    builder.root(&e);
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if stack.is_empty() {
                    if name != "package" {
                        return Err(ManifestError::UnexpectedRoot(name));
                    }
                    seen_root = true;
                    builder.root(&e);
                    continue;
                }
                builder.element(&stack, &name, "");
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| ManifestError::Xml {
                    position: reader.buffer_position() as u64,
                    source: quick_xml::Error::from(e),
                })?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    builder.element(&stack, &name, text.trim());
                }
                text.clear();
            }
            Event::Eof => {
                if let Some(open) = stack.last() {
                    return Err(ManifestError::Unclosed(open.clone()));
                }
                if !seen_root {
                    return Err(ManifestError::Empty);
                }
                break;
            }
            _ => {}
        }
    }

    builder.finish()
}

/// Read and parse a package's manifest. Failures degrade the package
/// instead of dropping it: the returned info carries the directory name and
/// no dependencies, alongside the error that caused it.
pub fn analyze_manifest(
    descriptor: &PackageDescriptor,
) -> (ManifestInfo, Option<ManifestError>) {
    let parsed = std::fs::read_to_string(&descriptor.manifest_path)
        .map_err(ManifestError::from)
        .and_then(|xml| parse_manifest(&xml));

    match parsed {
        Ok(info) => (info, None),
        Err(e) => {
            let info = ManifestInfo::degraded(&descriptor.dir_name(), e.to_string());
            (info, Some(e))
        }
    }
}

/// Warning for a manifest that degraded its package. Building it logs it.
pub fn degraded_warning(descriptor: &PackageDescriptor, error: &ManifestError) -> Warning {
    Warning::new(
        WarningKind::ManifestParse,
        Some(&descriptor.dir_name()),
        &descriptor.manifest_path,
        format!("{error}; scoring from source files only"),
    )
}
