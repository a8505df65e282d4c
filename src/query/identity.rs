// src/query/identity.rs

//! Identity resolver
//!
//! Turns (role scope, label, kind filters) into trove identities. Two join
//! strategies exist:
//!
//! - latest only: through `LatestCache`, the store-maintained newest
//!   version per (item, branch, flavor) for each role
//! - all versions: through the full `Nodes`/`Instances` graph, restricted
//!   by `UserGroupInstancesCache`
//!
//! Both select `DISTINCT` ids first, so a trove visible to several roles
//! in the scope comes back once.

use super::{ident_from_row, label_clause, TroveQuery};
use crate::db::troveinfo::{Metadata, TroveInfoTag};
use crate::error::{Error, Result, StoredValue};
use crate::model::{LabelList, Node, NodeKey, NodeList, Repository, RepositoryLabel, TroveList};
use crate::query::filter::KindFilter;
use crate::scope::RoleScope;
use crate::url::{LinkTarget, ResourceKind, UrlBuilder};
use crate::version::{branch_label, VersionString};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// One row of the trove search
struct SearchRow {
    item: String,
    version: String,
    flavor: String,
    timestamp: f64,
    branch_id: i64,
}

/// Search trove identities visible to `scope`
///
/// Results are ordered by (name, version, frozen flavor). Kind filters and
/// pagination apply after the fetch. With `latest`, each (name, branch)
/// yields only its newest version across all roles in the scope, with
/// every flavor of that version the scope can see.
pub fn search_troves(
    conn: &Connection,
    scope: &RoleScope,
    query: &TroveQuery,
    urls: Option<&dyn UrlBuilder>,
) -> Result<TroveList> {
    let (label_check, mut args) = label_clause(query.label.as_deref());
    args.extend(scope.params());

    let name_check = match query.name {
        Some(ref name) => {
            args.push(Value::Text(name.clone()));
            "WHERE Items.item = ?"
        }
        None => "",
    };

    let id_table = if query.latest {
        format!(
            "SELECT DISTINCT LatestCache.itemId AS itemId,
                             LatestCache.versionId AS versionId,
                             LatestCache.flavorId AS flavorId
                FROM Labels
                JOIN LabelMap ON LabelMap.labelId = Labels.labelId
                JOIN LatestCache ON LatestCache.itemId = LabelMap.itemId
                                AND LatestCache.branchId = LabelMap.branchId
                WHERE Labels.label {label_check}
                  AND LatestCache.latestType = 1
                  AND LatestCache.userGroupId IN ({roles})",
            roles = scope.placeholders(),
        )
    } else {
        format!(
            "SELECT DISTINCT Instances.itemId AS itemId,
                             Instances.versionId AS versionId,
                             Instances.flavorId AS flavorId
                FROM Labels
                JOIN LabelMap ON LabelMap.labelId = Labels.labelId
                JOIN Nodes ON Nodes.itemId = LabelMap.itemId
                          AND Nodes.branchId = LabelMap.branchId
                JOIN Instances ON Instances.itemId = Nodes.itemId
                              AND Instances.versionId = Nodes.versionId
                JOIN UserGroupInstancesCache AS ugi
                     ON ugi.instanceId = Instances.instanceId
                WHERE Labels.label {label_check}
                  AND ugi.userGroupId IN ({roles})",
            roles = scope.placeholders(),
        )
    };

    let sql = format!(
        "SELECT Items.item, Versions.version, Flavors.flavor, Nodes.finalTimestamp,
                Nodes.branchId
            FROM ({id_table}) AS idTable
            JOIN Items ON Items.itemId = idTable.itemId
            JOIN Versions ON Versions.versionId = idTable.versionId
            JOIN Flavors ON Flavors.flavorId = idTable.flavorId
            JOIN Nodes ON Nodes.itemId = idTable.itemId
                      AND Nodes.versionId = idTable.versionId
            {name_check}
            ORDER BY Items.item, Versions.version, Flavors.flavor"
    );

    debug!(
        "Searching troves (label={:?}, name={:?}, latest={}, roles={})",
        query.label,
        query.name,
        query.latest,
        scope.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok(SearchRow {
                item: row.get(0)?,
                version: row.get(1)?,
                flavor: row.get(2)?,
                timestamp: row.get(3)?,
                branch_id: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let fetched = rows.len();
    if query.latest {
        // Each role has its own latest row; roles may disagree
        rows = newest_per_branch(rows);
    }
    let limit = query.limit.unwrap_or(usize::MAX);

    let mut list = TroveList::new();
    for row in rows
        .into_iter()
        .filter(|row| query.types.admits(&row.item))
        .skip(query.start)
        .take(limit)
    {
        list.push(ident_from_row(row.item, &row.version, &row.flavor, Some(row.timestamp), urls)?);
    }

    debug!("Trove search fetched {} rows, returning {}", fetched, list.len());
    Ok(list)
}

/// Keep only rows of the newest version of each (item, branch)
///
/// Input order is preserved. Equal timestamps go to the first version seen.
fn newest_per_branch(rows: Vec<SearchRow>) -> Vec<SearchRow> {
    let mut newest: HashMap<(String, i64), (f64, String)> = HashMap::new();
    for row in &rows {
        let key = (row.item.clone(), row.branch_id);
        let newer = newest
            .get(&key)
            .is_none_or(|(timestamp, _)| row.timestamp > *timestamp);
        if newer {
            newest.insert(key, (row.timestamp, row.version.clone()));
        }
    }

    rows.into_iter()
        .filter(|row| {
            newest
                .get(&(row.item.clone(), row.branch_id))
                .is_some_and(|(_, version)| *version == row.version)
        })
        .collect()
}

/// Distinct trailing labels of every branch with latest troves in scope
pub fn list_labels(conn: &Connection, scope: &RoleScope) -> Result<LabelList> {
    let sql = format!(
        "SELECT Branches.branch FROM
            (SELECT DISTINCT branchId FROM LatestCache
                WHERE userGroupId IN ({}) AND latestType = 1) AS AvailBranches
            JOIN Branches ON Branches.branchId = AvailBranches.branchId",
        scope.placeholders()
    );

    let mut stmt = conn.prepare(&sql)?;
    let branches = stmt
        .query_map(params_from_iter(scope.params()), |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut labels = BTreeSet::new();
    for branch in branches {
        let label = branch_label(&branch)
            .map_err(|e| Error::CorruptRecord(format!("stored branch '{branch}': {e}")))?;
        labels.insert(label.to_string());
    }

    Ok(LabelList {
        labels: labels.into_iter().collect(),
    })
}

/// One row of the node query
struct NodeRow {
    item: String,
    branch: String,
    version: String,
    flavor: String,
    timestamp: f64,
    node_id: i64,
    instance_id: i64,
}

/// Nodes (name, branch) with latest troves visible to `scope`
///
/// Each node reports the newest version on its branch and every flavor of
/// that version.
pub fn search_nodes(
    conn: &Connection,
    scope: &RoleScope,
    label: Option<&str>,
    types: &KindFilter,
    urls: Option<&dyn UrlBuilder>,
) -> Result<NodeList> {
    let (label_check, mut args) = label_clause(label);
    args.extend(scope.params());

    let sql = format!(
        "SELECT DISTINCT Items.item, Branches.branch, Versions.version, Flavors.flavor,
                         Nodes.finalTimestamp, Nodes.nodeId, Instances.instanceId
            FROM Labels
            JOIN LabelMap ON LabelMap.labelId = Labels.labelId
            JOIN LatestCache ON LatestCache.itemId = LabelMap.itemId
                            AND LatestCache.branchId = LabelMap.branchId
            JOIN Items ON Items.itemId = LatestCache.itemId
            JOIN Branches ON Branches.branchId = LatestCache.branchId
            JOIN Versions ON Versions.versionId = LatestCache.versionId
            JOIN Flavors ON Flavors.flavorId = LatestCache.flavorId
            JOIN Nodes ON Nodes.itemId = LatestCache.itemId
                      AND Nodes.versionId = LatestCache.versionId
            JOIN Instances ON Instances.itemId = LatestCache.itemId
                          AND Instances.versionId = LatestCache.versionId
                          AND Instances.flavorId = LatestCache.flavorId
            WHERE Labels.label {label_check}
              AND LatestCache.latestType = 1
              AND LatestCache.userGroupId IN ({roles})
            ORDER BY Items.item, Branches.branch, Nodes.finalTimestamp DESC, Flavors.flavor",
        roles = scope.placeholders(),
    );

    debug!("Searching nodes (label={:?}, roles={})", label, scope.len());

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok(NodeRow {
                item: row.get(0)?,
                branch: row.get(1)?,
                version: row.get(2)?,
                flavor: row.get(3)?,
                timestamp: row.get(4)?,
                node_id: row.get(5)?,
                instance_id: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Rows arrive grouped by (item, branch) with the newest version first
    let mut groups: Vec<Vec<NodeRow>> = Vec::new();
    for row in rows.into_iter().filter(|r| types.admits(&r.item)) {
        match groups.last_mut() {
            Some(group) if group[0].item == row.item && group[0].branch == row.branch => {
                if group[0].version == row.version {
                    group.push(row);
                }
            }
            _ => groups.push(vec![row]),
        }
    }

    let mut list = NodeList::default();
    for group in groups {
        list.nodes.push(build_node(conn, group, urls)?);
    }
    Ok(list)
}

fn build_node(conn: &Connection, group: Vec<NodeRow>, urls: Option<&dyn UrlBuilder>) -> Result<Node> {
    let newest = &group[0];
    let version = VersionString::parse(&newest.version).stored("version")?;
    let label = version.trailing_label().to_string();

    let shortdesc = load_shortdesc(conn, newest.instance_id)?;
    let changelog = conn
        .query_row(
            "SELECT message FROM ChangeLogs WHERE nodeId = ?1",
            params![newest.node_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();

    let full_trove_list = NodeKey {
        host: version.host().to_string(),
        label: label.clone(),
        name: newest.item.clone(),
    };

    let mut flavors = Vec::with_capacity(group.len());
    let mut troves = Vec::with_capacity(group.len());
    for row in &group {
        let ident = ident_from_row(row.item.clone(), &row.version, &row.flavor, Some(row.timestamp), urls)?;
        flavors.push(ident.flavor.clone());
        troves.push(ident);
    }

    Ok(Node {
        name: newest.item.clone(),
        label,
        version: version.revision().to_string(),
        flavors,
        shortdesc,
        changelog,
        troves,
        full_trove_list,
    })
}

fn load_shortdesc(conn: &Connection, instance_id: i64) -> Result<Option<String>> {
    let data = conn
        .query_row(
            "SELECT data FROM TroveInfo WHERE instanceId = ?1 AND infoType = ?2",
            params![instance_id, TroveInfoTag::Metadata.id()],
            |row| row.get::<_, Option<Vec<u8>>>(0),
        )
        .optional()?
        .flatten();

    match data {
        Some(data) => Ok(Metadata::thaw(&data)?.short_desc),
        None => Ok(None),
    }
}

/// The repository root: one entry per visible label
pub fn get_repository(
    conn: &Connection,
    scope: &RoleScope,
    urls: &dyn UrlBuilder,
) -> Result<Repository> {
    let labels = list_labels(conn, scope)?;

    Ok(Repository {
        id: urls.make_url(ResourceKind::Repository, &LinkTarget::collection()),
        labels: labels
            .labels
            .into_iter()
            .map(|name| RepositoryLabel::new(name, urls))
            .collect(),
    })
}
