//! Dependencies-first install ordering.

use std::collections::{BTreeMap, BTreeSet};

use burrow_core::types::Category;

use crate::{Lock, LockError, LockResult, LockedPackage};

impl Lock {
    /// Packages ordered so each one follows all of its dependencies.
    ///
    /// Ties are broken by name, so the order is stable for a given lock.
    pub fn install_order(&self) -> LockResult<Vec<&LockedPackage>> {
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for package in &self.packages {
            for dependency in &package.dependencies {
                if self.package(dependency).is_none() {
                    return Err(LockError::malformed(format!(
                        "'{}' depends on '{}', which is not locked",
                        package.name, dependency
                    )));
                }
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .push(package.name.as_str());
            }
            pending.insert(package.name.as_str(), package.dependencies.len());
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.packages.len());

        while let Some(name) = ready.pop_first() {
            if let Some(package) = self.package(name) {
                order.push(package);
            }
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() < self.packages.len() {
            let placed: BTreeSet<&str> = order.iter().map(|p| p.name.as_str()).collect();
            return Err(LockError::Cycle {
                cycle: self.find_cycle(&placed),
            });
        }
        Ok(order)
    }

    /// Install order restricted to packages in any of `categories`
    pub fn install_order_for(&self, categories: &BTreeSet<Category>) -> LockResult<Vec<&LockedPackage>> {
        Ok(self
            .install_order()?
            .into_iter()
            .filter(|package| !package.categories.is_disjoint(categories))
            .collect())
    }

    // Every unplaced package has an unplaced dependency, so walking those
    // edges must revisit a package.
    fn find_cycle(&self, placed: &BTreeSet<&str>) -> String {
        let unplaced = |name: &str| !placed.contains(name);
        let Some(start) = self.packages.iter().find(|p| unplaced(&p.name)) else {
            return String::new();
        };

        let mut path: Vec<&str> = vec![start.name.as_str()];
        loop {
            let current = path[path.len() - 1];
            let next = self
                .package(current)
                .and_then(|p| p.dependencies.iter().find(|d| unplaced(d)))
                .map(String::as_str);
            let Some(next) = next else {
                return path.join(" -> ");
            };
            if let Some(index) = path.iter().position(|name| *name == next) {
                let mut cycle = path[index..].to_vec();
                cycle.push(next);
                return cycle.join(" -> ");
            }
            path.push(next);
        }
    }
}
