// src/model/repository.rs

//! Repository root and per-label link collections

use crate::error::Result;
use crate::model::element::{Element, ElementBuilder, Schema};
use crate::model::Resource;
use crate::query::filter::TroveKind;
use crate::url::{LinkTarget, ResourceKind, UrlBuilder};
use serde::Serialize;

static LABEL_SCHEMA: Schema = Schema {
    tag: "Label",
    attributes: &[],
    fields: &["name", "latestTroves", "allTroves", "nodeList"],
};

static NODE_LIST_LINK_SCHEMA: Schema = Schema {
    tag: "nodeList",
    attributes: &["href"],
    fields: &["type"],
};

static REPOSITORY_SCHEMA: Schema = Schema {
    tag: "Repository",
    attributes: &["id"],
    fields: &["label"],
};

/// Node list kinds linked from every label
const NODE_LIST_KINDS: [TroveKind; 2] = [TroveKind::Group, TroveKind::Package];

/// Link to the nodes of one kind under a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeListLink {
    pub kind: TroveKind,
    pub href: String,
}

/// One label with links to its sub-collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryLabel {
    pub name: String,
    pub latest_troves: String,
    pub all_troves: String,
    pub node_lists: Vec<NodeListLink>,
}

impl RepositoryLabel {
    pub fn new(name: impl Into<String>, urls: &dyn UrlBuilder) -> Self {
        let name = name.into();
        let latest_troves = urls.make_url(
            ResourceKind::Trove,
            &LinkTarget::collection().param("label", &name),
        );
        let all_troves = urls.make_url(
            ResourceKind::Trove,
            &LinkTarget::collection()
                .param("label", &name)
                .param("latest", "0"),
        );
        let node_lists = NODE_LIST_KINDS
            .iter()
            .map(|kind| NodeListLink {
                kind: *kind,
                href: urls.make_url(
                    ResourceKind::Node,
                    &LinkTarget::collection()
                        .param("label", &name)
                        .param("type", kind.as_str()),
                ),
            })
            .collect();

        Self {
            name,
            latest_troves,
            all_troves,
            node_lists,
        }
    }
}

impl Resource for RepositoryLabel {
    fn schema(&self) -> &'static Schema {
        &LABEL_SCHEMA
    }

    fn to_element(&self, _urls: &dyn UrlBuilder) -> Result<Element> {
        let node_lists = self
            .node_lists
            .iter()
            .map(|link| {
                Ok(ElementBuilder::new(&NODE_LIST_LINK_SCHEMA)
                    .attr("href", &link.href)?
                    .text("type", link.kind.as_str())?
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ElementBuilder::new(&LABEL_SCHEMA)
            .text("name", &self.name)?
            .text("latestTroves", &self.latest_troves)?
            .text("allTroves", &self.all_troves)?
            .children("nodeList", node_lists)?
            .build())
    }
}

/// The labels visible to a role scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: String,
    pub labels: Vec<RepositoryLabel>,
}

impl Resource for Repository {
    fn schema(&self) -> &'static Schema {
        &REPOSITORY_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let labels = self
            .labels
            .iter()
            .map(|l| l.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        Ok(ElementBuilder::new(&REPOSITORY_SCHEMA)
            .attr("id", &self.id)?
            .children("label", labels)?
            .build())
    }
}
