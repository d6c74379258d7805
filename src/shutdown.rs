//! Orderly stop of interdependent units.
//!
//! Units declare, by name, which other units they require to stay up.
//! Those declarations become a directed dependency graph that an
//! external [`DependencyOrderer`] linearizes; units are then stopped
//! in the returned order, dependents before their dependencies. The
//! linearization algorithm itself lives behind the trait, and cycle
//! reports coming back from it are logged, nothing more.

use std::collections::HashMap;

use crate::errors::Result;

/// A stoppable unit participating in ordered shutdown.
pub trait StopUnit {
    /// Name of the unit, unique among the units being stopped.
    fn name(&self) -> &str;

    /// Whether the unit is still running. Checked again right before
    /// the stop call, since stopping one unit may take others down
    /// with it.
    fn is_active(&self) -> bool;

    /// Names of the units this one requires to stay up while it runs.
    /// Names without a matching active unit are ignored.
    fn requirements(&self) -> Vec<String>;

    /// Stop the unit. A failure here is logged by the caller and does
    /// not abort the rest of the shutdown.
    fn stop(&mut self) -> Result<()>;
}

/// What a [`DependencyOrderer`] hands back: the linearized node order
/// plus the node groups whose dependencies form cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOrder {
    /// Node names, dependents before their dependencies wherever no
    /// cycle prevents it.
    pub ordered: Vec<String>,
    /// Groups of nodes involved in dependency cycles. Diagnostic
    /// only; cyclic nodes still appear in `ordered`.
    pub cycles: Vec<Vec<String>>,
}

/// External utility that linearizes a dependency graph.
///
/// `edges` lists `(dependent, dependency)` pairs over the names in
/// `nodes`. The returned order puts dependents before their
/// dependencies wherever cycles permit; how cycles are broken is the
/// implementation's business and is only reported back for
/// diagnostics.
pub trait DependencyOrderer {
    fn compute_order(
        &self,
        nodes: Vec<String>,
        edges: &[(String, String)],
    ) -> NodeOrder;
}

/// Stop every active unit in dependency order, so that each unit goes
/// down before the units it requires. Stop failures are logged and
/// skipped over. Returns how many units were actually stopped.
pub fn stop_in_dependency_order<U: StopUnit>(
    units: &mut [U],
    orderer: &impl DependencyOrderer,
) -> usize {
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (index, unit) in units.iter().enumerate() {
        if unit.is_active() {
            by_name.insert(unit.name().to_owned(), index);
        }
    }
    log::debug!("shutdown: stopping {} active units", by_name.len());

    let mut edges = Vec::new();
    for unit in units.iter() {
        if !unit.is_active() {
            continue;
        }
        for required in unit.requirements() {
            // requirements on inactive or unknown units are not edges
            if !by_name.contains_key(&required) {
                continue;
            }
            log::trace!("shutdown: {} requires {}", unit.name(), required);
            edges.push((unit.name().to_owned(), required));
        }
    }

    let nodes: Vec<String> = units
        .iter()
        .filter(|unit| unit.is_active())
        .map(|unit| unit.name().to_owned())
        .collect();
    let order = orderer.compute_order(nodes, &edges);
    for cycle in &order.cycles {
        log::debug!("shutdown: dependency cycle: {}", cycle.join(" -> "));
    }

    let mut stopped = 0;
    for name in &order.ordered {
        let index = match by_name.get(name) {
            Some(index) => *index,
            // not one of our units; ignore whatever else the orderer
            // put into the result
            None => continue,
        };
        let unit = &mut units[index];
        // stopping an earlier unit may have taken this one down
        if !unit.is_active() {
            continue;
        }
        log::debug!("shutdown: stopping {}", unit.name());
        if let Err(err) = unit.stop() {
            log::error!("shutdown: failed to stop {}: {}", unit.name(), err);
            continue;
        }
        stopped += 1;
    }
    stopped
}
