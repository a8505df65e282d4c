// src/model/trove.rs

//! Trove documents: identities, lists, and the fully assembled trove

use crate::error::{Error, Result};
use crate::model::element::{Element, ElementBuilder, Schema, Value};
use crate::model::Resource;
use crate::url::{LinkTarget, ResourceKind, UrlBuilder};
use crate::version::VersionInfo;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

static VERSION_SCHEMA: Schema = Schema {
    tag: "version",
    attributes: &[],
    fields: &["full", "label", "revision", "ordering"],
};

static TROVE_IDENT_SCHEMA: Schema = Schema {
    tag: "trove",
    attributes: &["id"],
    fields: &["name", "version", "flavor"],
};

static TROVE_LIST_SCHEMA: Schema = Schema {
    tag: "troveList",
    attributes: &[],
    fields: &["trove"],
};

static LABEL_LIST_SCHEMA: Schema = Schema {
    tag: "labelList",
    attributes: &[],
    fields: &["label"],
};

static FILE_IN_TROVE_SCHEMA: Schema = Schema {
    tag: "file",
    attributes: &["id"],
    fields: &["path", "version", "pathId", "fileId"],
};

static SINGLE_TROVE_SCHEMA: Schema = Schema {
    tag: "Trove",
    attributes: &["id"],
    fields: &[
        "name",
        "version",
        "flavor",
        "buildtime",
        "source",
        "clonedFrom",
        "file",
        "trove",
    ],
};

static TROVE_COLLECTION_SCHEMA: Schema = Schema {
    tag: "troves",
    attributes: &[],
    fields: &["trove"],
};

fn version_element(version: &VersionInfo) -> Result<Element> {
    let mut builder = ElementBuilder::new(&VERSION_SCHEMA)
        .text("full", &version.full)?
        .text("label", &version.label)?
        .text("revision", &version.revision)?;
    if let Some(ordering) = version.ordering {
        builder = builder.value("ordering", Value::Float(ordering))?;
    }
    Ok(builder.build())
}

/// A `name=version[flavor]` trove key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroveSpec {
    pub name: String,
    pub version: String,
    /// Flavor body without brackets, as given
    pub flavor: String,
}

impl TroveSpec {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTroveSpec(s.to_string());

        let (name, rest) = s.split_once('=').ok_or_else(invalid)?;
        let (version, flavor) = rest.split_once('[').ok_or_else(invalid)?;
        let flavor = flavor.strip_suffix(']').ok_or_else(invalid)?;

        if name.is_empty() || version.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            flavor: flavor.to_string(),
        })
    }
}

impl fmt::Display for TroveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}[{}]", self.name, self.version, self.flavor)
    }
}

impl FromStr for TroveSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TroveSpec::parse(s)
    }
}

/// A trove identity with its hypermedia id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TroveIdent {
    pub name: String,
    pub version: VersionInfo,
    /// Canonical flavor body
    pub flavor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TroveIdent {
    /// Build an identity; with a URL builder, the id points at the host
    /// serving the version's trailing label
    pub fn new(
        name: impl Into<String>,
        version: VersionInfo,
        flavor: impl Into<String>,
        urls: Option<&dyn UrlBuilder>,
    ) -> Self {
        let mut ident = Self {
            name: name.into(),
            version,
            flavor: flavor.into(),
            id: None,
        };
        if let Some(urls) = urls {
            let key = ident.key();
            ident.id = Some(urls.make_url(
                ResourceKind::Trove,
                &LinkTarget::key(&key).host(ident.version.host()),
            ));
        }
        ident
    }

    /// The `name=version[flavor]` key of this trove
    pub fn key(&self) -> String {
        format!("{}={}[{}]", self.name, self.version.full, self.flavor)
    }

    fn element_with(&self, schema: &'static Schema) -> Result<ElementBuilder> {
        ElementBuilder::new(schema)
            .attr_opt("id", self.id.as_deref())?
            .text("name", &self.name)?
            .child("version", version_element(&self.version)?)?
            .text("flavor", &self.flavor)
    }
}

impl Resource for TroveIdent {
    fn schema(&self) -> &'static Schema {
        &TROVE_IDENT_SCHEMA
    }

    fn to_element(&self, _urls: &dyn UrlBuilder) -> Result<Element> {
        Ok(self.element_with(&TROVE_IDENT_SCHEMA)?.build())
    }
}

/// Result of a trove search
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TroveList {
    pub troves: Vec<TroveIdent>,
}

impl TroveList {
    pub fn new() -> Self {
        Self { troves: Vec::new() }
    }

    pub fn push(&mut self, trove: TroveIdent) {
        self.troves.push(trove);
    }

    pub fn len(&self) -> usize {
        self.troves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.troves.is_empty()
    }
}

impl Resource for TroveList {
    fn schema(&self) -> &'static Schema {
        &TROVE_LIST_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let troves = self
            .troves
            .iter()
            .map(|t| t.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        Ok(ElementBuilder::new(&TROVE_LIST_SCHEMA)
            .children("trove", troves)?
            .build())
    }
}

/// Sorted, deduplicated label names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelList {
    pub labels: Vec<String>,
}

impl Resource for LabelList {
    fn schema(&self) -> &'static Schema {
        &LABEL_LIST_SCHEMA
    }

    fn to_element(&self, _urls: &dyn UrlBuilder) -> Result<Element> {
        self.labels
            .iter()
            .try_fold(ElementBuilder::new(&LABEL_LIST_SCHEMA), |b, label| {
                b.text("label", label)
            })
            .map(ElementBuilder::build)
    }
}

/// One file entry of a trove
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInTrove {
    pub path: String,
    pub version: String,
    /// Hex encoded 16 byte path id
    pub path_id: String,
    /// Hex encoded 20 byte content id
    pub file_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FileInTrove {
    /// `host` is the host of the file version's trailing label
    pub fn new(
        path: String,
        version: String,
        path_id: String,
        file_id: String,
        host: Option<&str>,
        urls: Option<&dyn UrlBuilder>,
    ) -> Self {
        let id = urls.map(|urls| {
            let mut target = LinkTarget::key(&file_id).sub("info");
            if let Some(host) = host {
                target = target.host(host);
            }
            urls.make_url(ResourceKind::File, &target)
        });
        Self {
            path,
            version,
            path_id,
            file_id,
            id,
        }
    }
}

impl Resource for FileInTrove {
    fn schema(&self) -> &'static Schema {
        &FILE_IN_TROVE_SCHEMA
    }

    fn to_element(&self, _urls: &dyn UrlBuilder) -> Result<Element> {
        Ok(ElementBuilder::new(&FILE_IN_TROVE_SCHEMA)
            .attr_opt("id", self.id.as_deref())?
            .text("path", &self.path)?
            .text("version", &self.version)?
            .text("pathId", &self.path_id)?
            .text("fileId", &self.file_id)?
            .build())
    }
}

/// A fully assembled trove
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleTrove {
    #[serde(flatten)]
    pub ident: TroveIdent,
    pub build_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TroveIdent>,
    pub cloned_from: Vec<TroveIdent>,
    pub files: Vec<FileInTrove>,
    pub troves: Vec<TroveIdent>,
}

impl SingleTrove {
    pub fn new(ident: TroveIdent, build_time: u64) -> Self {
        Self {
            ident,
            build_time,
            source: None,
            cloned_from: Vec::new(),
            files: Vec::new(),
            troves: Vec::new(),
        }
    }

    pub fn add_cloned_from(&mut self, ident: TroveIdent) {
        self.cloned_from.push(ident);
    }

    pub fn add_file(&mut self, file: FileInTrove) {
        self.files.push(file);
    }

    pub fn add_referenced_trove(&mut self, ident: TroveIdent) {
        self.troves.push(ident);
    }
}

impl Resource for SingleTrove {
    fn schema(&self) -> &'static Schema {
        &SINGLE_TROVE_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let mut builder = self
            .ident
            .element_with(&SINGLE_TROVE_SCHEMA)?
            .unsigned("buildtime", self.build_time)?;

        if let Some(ref source) = self.source {
            builder = builder.child("source", source.to_element(urls)?)?;
        }

        let cloned = self
            .cloned_from
            .iter()
            .map(|t| t.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        let files = self
            .files
            .iter()
            .map(|f| f.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        let troves = self
            .troves
            .iter()
            .map(|t| t.to_element(urls))
            .collect::<Result<Vec<_>>>()?;

        Ok(builder
            .children("clonedFrom", cloned)?
            .children("file", files)?
            .children("trove", troves)?
            .build())
    }
}

/// Every flavor of one `name=version`, each fully assembled
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TroveCollection {
    pub troves: Vec<SingleTrove>,
}

impl Resource for TroveCollection {
    fn schema(&self) -> &'static Schema {
        &TROVE_COLLECTION_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let troves = self
            .troves
            .iter()
            .map(|t| t.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        Ok(ElementBuilder::new(&TROVE_COLLECTION_SCHEMA)
            .children("trove", troves)?
            .build())
    }
}
