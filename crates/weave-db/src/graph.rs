//! Breadth-first traversal of the undirected connection graph.
//!
//! Edges are stored once per pair, in whichever direction the request was
//! made, so every layer is expanded with a single query matching the
//! frontier on either column.

use std::collections::HashSet;

use anyhow::Result;
use rusqlite::Connection;
use weave_types::models::Degree;

use crate::Database;
use crate::queries::{as_params, placeholders};

/// Deepest layer the network view distinguishes (3rd degree).
pub const MAX_DEGREE: usize = 3;

/// The 1st, 2nd and 3rd degree neighbourhoods of a user.
#[derive(Debug, Default, Clone)]
pub struct Network {
    pub layers: Vec<HashSet<i64>>,
}

impl Network {
    /// Degree of `user_id` relative to the network's origin.
    pub fn degree_of(&self, user_id: i64) -> Degree {
        self.layers
            .iter()
            .position(|layer| layer.contains(&user_id))
            .map(|i| Degree::from_depth(i + 1))
            .unwrap_or(Degree::Outside)
    }
}

impl Database {
    /// Layers 1..=3 around `origin`.
    pub fn network(&self, origin: i64) -> Result<Network> {
        self.with_conn(|conn| walk(conn, origin, MAX_DEGREE, None))
            .map(|(network, _)| network)
    }

    /// Degree of `viewer` as seen from `user_id`. `None` viewer or the user
    /// looking at themselves yields `Degree::Outside`.
    pub fn degree(&self, user_id: i64, viewer: Option<i64>) -> Result<Degree> {
        let Some(viewer) = viewer else {
            return Ok(Degree::Outside);
        };
        if viewer == user_id {
            return Ok(Degree::Outside);
        }
        self.with_conn(|conn| walk(conn, user_id, MAX_DEGREE, Some(viewer)))
            .map(|(_, found)| found.map(Degree::from_depth).unwrap_or(Degree::Outside))
    }
}

/// Expands layers from `origin` up to `max_depth`. When `target` is given
/// the walk stops at the layer containing it and returns that depth.
fn walk(
    conn: &Connection,
    origin: i64,
    max_depth: usize,
    target: Option<i64>,
) -> Result<(Network, Option<usize>)> {
    let mut seen: HashSet<i64> = HashSet::from([origin]);
    let mut frontier: Vec<i64> = vec![origin];
    let mut network = Network::default();

    for depth in 1..=max_depth {
        let mut layer = HashSet::new();
        for (from_id, to_id) in edges_touching(conn, &frontier)? {
            for id in [from_id, to_id] {
                if seen.insert(id) {
                    layer.insert(id);
                }
            }
        }
        if layer.is_empty() {
            break;
        }

        let hit = target.is_some_and(|t| layer.contains(&t));
        frontier = layer.iter().copied().collect();
        network.layers.push(layer);

        if hit {
            return Ok((network, Some(depth)));
        }
    }

    Ok((network, None))
}

fn edges_touching(conn: &Connection, ids: &[i64]) -> Result<Vec<(i64, i64)>> {
    let list = placeholders(1, ids.len());
    let sql = format!(
        "SELECT from_id, to_id FROM connections WHERE from_id IN ({list}) OR to_id IN ({list})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let edges = stmt
        .query_map(as_params(ids).as_slice(), |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(edges)
}
