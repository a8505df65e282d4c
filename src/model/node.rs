// src/model/node.rs

//! Nodes: the trove variants sharing one (name, branch)

use crate::error::Result;
use crate::model::element::{Element, ElementBuilder, Schema};
use crate::model::trove::TroveIdent;
use crate::model::Resource;
use crate::url::{LinkTarget, ResourceKind, UrlBuilder};
use serde::Serialize;

static NODE_SCHEMA: Schema = Schema {
    tag: "Node",
    attributes: &["id"],
    fields: &[
        "name",
        "label",
        "version",
        "flavor",
        "shortdesc",
        "changelog",
        "trove",
        "troveList",
        "fullTroveList",
    ],
};

static NODE_LIST_SCHEMA: Schema = Schema {
    tag: "nodeList",
    attributes: &[],
    fields: &["node"],
};

/// Lookup key for the trove lists of a node
///
/// Rendered into links on demand instead of embedding the lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeKey {
    pub host: String,
    pub label: String,
    pub name: String,
}

impl NodeKey {
    fn target(&self) -> LinkTarget<'_> {
        LinkTarget::collection()
            .host(&self.host)
            .param("label", &self.label)
            .param("name", &self.name)
    }

    /// Newest troves of the node
    pub fn latest_link(&self, urls: &dyn UrlBuilder) -> String {
        urls.make_url(ResourceKind::Trove, &self.target())
    }

    /// Every version of the node
    pub fn link(&self, urls: &dyn UrlBuilder) -> String {
        urls.make_url(ResourceKind::Trove, &self.target().param("latest", "0"))
    }
}

/// Newest version of one (name, branch)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub label: String,
    /// Revision of the newest version
    pub version: String,
    /// One entry per flavor of the newest version
    pub flavors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortdesc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// The newest troves of this node
    pub troves: Vec<TroveIdent>,
    pub full_trove_list: NodeKey,
}

impl Resource for Node {
    fn schema(&self) -> &'static Schema {
        &NODE_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let troves = self
            .troves
            .iter()
            .map(|t| t.to_element(urls))
            .collect::<Result<Vec<_>>>()?;

        let builder = self
            .flavors
            .iter()
            .try_fold(
                ElementBuilder::new(&NODE_SCHEMA)
                    .text("name", &self.name)?
                    .text("label", &self.label)?
                    .text("version", &self.version)?,
                |b, flavor| b.text("flavor", flavor),
            )?;

        Ok(builder
            .text_opt("shortdesc", self.shortdesc.as_deref())?
            .text_opt("changelog", self.changelog.as_deref())?
            .children("trove", troves)?
            .text("troveList", self.full_trove_list.latest_link(urls))?
            .text("fullTroveList", self.full_trove_list.link(urls))?
            .build())
    }
}

/// Nodes of one label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeList {
    pub nodes: Vec<Node>,
}

impl Resource for NodeList {
    fn schema(&self) -> &'static Schema {
        &NODE_LIST_SCHEMA
    }

    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element> {
        let nodes = self
            .nodes
            .iter()
            .map(|n| n.to_element(urls))
            .collect::<Result<Vec<_>>>()?;
        Ok(ElementBuilder::new(&NODE_LIST_SCHEMA)
            .children("node", nodes)?
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::BaseUrl;

    #[test]
    fn test_list_links_are_resolved_on_render() {
        let urls = BaseUrl::parse("http://localhost:9000/").unwrap();
        let node = Node {
            name: "foo".to_string(),
            label: "repo.example.com@ns:1".to_string(),
            version: "1-1-1".to_string(),
            flavors: vec!["is: x86".to_string(), "is: x86_64".to_string()],
            shortdesc: None,
            changelog: Some("initial import".to_string()),
            troves: Vec::new(),
            full_trove_list: NodeKey {
                host: "repo.example.com".to_string(),
                label: "repo.example.com@ns:1".to_string(),
                name: "foo".to_string(),
            },
        };

        let element = node.to_element(&urls).unwrap();
        assert_eq!(element.fields("flavor").count(), 2);
        assert!(element.field("shortdesc").is_none());
        assert_eq!(element.text("changelog"), Some("initial import"));
        assert_eq!(
            element.text("troveList"),
            Some("http://repo.example.com:9000/trove?label=repo.example.com%40ns%3A1&name=foo")
        );
        assert_eq!(
            element.text("fullTroveList"),
            Some(
                "http://repo.example.com:9000/trove?label=repo.example.com%40ns%3A1&name=foo&latest=0"
            )
        );
    }
}
