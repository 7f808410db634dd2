//! Batched link resolution
//!
//! A pass collects every link chain of the tree, then resolves them round by
//! round: round `n` reads the `n`-th link of every chain still alive. Within
//! a round, cells are deduplicated and grouped by dataset, and each dataset
//! gets exactly one `resolve_batch` call. Dataset groups are spread over a
//! bounded pool of scoped threads.
//!
//! The result is a memo (`ResolvedCells`) that answers the same questions a
//! live resolver would, so value resolution never touches I/O after the pass.

use property_value::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::cancel::{CancelToken, Cancelled};
use crate::ids::DatasetId;

use super::{CellKey, Links, ResolveError, Resolver};

/// Default bound on chain length followed by a pass
pub const DEFAULT_MAX_LINK_DEPTH: usize = 8;

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub rounds: usize,
    /// `resolve_batch` calls issued
    pub batches: usize,
    /// Distinct cells requested
    pub cells: usize,
    pub failed_datasets: usize,
}

/// Memo of one pass
#[derive(Debug, Clone, Default)]
pub struct ResolvedCells {
    cells: HashMap<CellKey, Option<Value>>,
    failed: HashMap<DatasetId, ResolveError>,
    stats: PassStats,
}

impl ResolvedCells {
    /// `None` when the cell was never requested; `Some(None)` when it was
    /// requested and not found.
    pub fn get(&self, cell: &CellKey) -> Option<Option<&Value>> {
        self.cells.get(cell).map(Option::as_ref)
    }

    pub fn failure(&self, dataset: &DatasetId) -> Option<&ResolveError> {
        self.failed.get(dataset)
    }

    pub fn failed_datasets(&self) -> impl Iterator<Item = &DatasetId> {
        self.failed.keys()
    }

    pub fn stats(&self) -> PassStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn record(&mut self, dataset: DatasetId, cells: Vec<CellKey>, result: Result<HashMap<CellKey, Value>, ResolveError>) {
        match result {
            Ok(mut found) => {
                for cell in cells {
                    let value = found.remove(&cell);
                    self.cells.insert(cell, value);
                }
            }
            Err(err) => {
                tracing::warn!(dataset = %dataset, error = %err.message, "dataset batch failed");
                self.failed.insert(dataset, err);
            }
        }
    }
}

impl Resolver for ResolvedCells {
    fn resolve_cell(&self, cell: &CellKey) -> Result<Option<Value>, ResolveError> {
        if let Some(err) = self.failed.get(&cell.dataset) {
            return Err(err.clone());
        }
        Ok(self.cells.get(cell).cloned().flatten())
    }

    fn resolve_batch(
        &self,
        dataset: &DatasetId,
        cells: &[CellKey],
    ) -> Result<HashMap<CellKey, Value>, ResolveError> {
        if let Some(err) = self.failed.get(dataset) {
            return Err(err.clone());
        }
        Ok(cells
            .iter()
            .filter_map(|c| Some((c.clone(), self.cells.get(c)?.clone()?)))
            .collect())
    }
}

type Fetched = (DatasetId, Vec<CellKey>, Result<HashMap<CellKey, Value>, ResolveError>);

/// Drives batched passes against a resolver
#[derive(Debug)]
pub struct BatchResolver<'a, R: Resolver + ?Sized> {
    resolver: &'a R,
    workers: usize,
    max_depth: usize,
}

impl<'a, R: Resolver + ?Sized> BatchResolver<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            workers: 1,
            max_depth: DEFAULT_MAX_LINK_DEPTH,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Links past `depth` are treated as not found
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Resolve every cell reachable from `chains`.
    ///
    /// Chains must already be bound to their row context. A failing dataset
    /// is recorded in the memo and does not stop the pass; cancellation does.
    pub fn prefetch(&self, chains: &[Links], cancel: &CancelToken) -> Result<ResolvedCells, Cancelled> {
        let mut memo = ResolvedCells::default();
        let mut alive: Vec<(&Links, Option<Value>)> =
            chains.iter().filter(|c| !c.is_empty()).map(|c| (c, None)).collect();

        for depth in 0..self.max_depth {
            if alive.is_empty() {
                break;
            }
            cancel.check()?;

            let mut keyed = Vec::with_capacity(alive.len());
            let mut wanted: BTreeMap<DatasetId, BTreeSet<CellKey>> = BTreeMap::new();
            for (links, previous) in alive.drain(..) {
                let Some(cell) = links.cell_at(depth, previous.as_ref()) else {
                    continue;
                };
                if memo.failed.contains_key(&cell.dataset) {
                    continue;
                }
                if !memo.cells.contains_key(&cell) {
                    wanted.entry(cell.dataset.clone()).or_default().insert(cell.clone());
                }
                keyed.push((links, cell));
            }

            if !wanted.is_empty() {
                memo.stats.rounds += 1;
                memo.stats.batches += wanted.len();
                memo.stats.cells += wanted.values().map(BTreeSet::len).sum::<usize>();
                let groups = wanted
                    .into_iter()
                    .map(|(dataset, cells)| (dataset, cells.into_iter().collect()))
                    .collect();
                for (dataset, cells, result) in self.fetch(groups, cancel)? {
                    memo.record(dataset, cells, result);
                }
                cancel.check()?;
            }

            alive = keyed
                .into_iter()
                .filter(|(links, _)| depth + 1 < links.len())
                .filter_map(|(links, cell)| {
                    let value = memo.cells.get(&cell).cloned().flatten()?;
                    Some((links, Some(value)))
                })
                .collect();
        }

        memo.stats.failed_datasets = memo.failed.len();
        tracing::debug!(
            rounds = memo.stats.rounds,
            batches = memo.stats.batches,
            cells = memo.stats.cells,
            failed = memo.stats.failed_datasets,
            "link pass complete"
        );
        Ok(memo)
    }

    fn fetch(&self, groups: Vec<(DatasetId, Vec<CellKey>)>, cancel: &CancelToken) -> Result<Vec<Fetched>, Cancelled> {
        let workers = self.workers.min(groups.len());
        if workers <= 1 {
            let mut fetched = Vec::with_capacity(groups.len());
            for (dataset, cells) in groups {
                cancel.check()?;
                let result = self.resolver.resolve_batch(&dataset, &cells);
                fetched.push((dataset, cells, result));
            }
            return Ok(fetched);
        }

        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<Option<Result<HashMap<CellKey, Value>, ResolveError>>>> =
            Mutex::new(vec![None; groups.len()]);
        let stopped: Mutex<Option<Cancelled>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some((dataset, cells)) = groups.get(index) else {
                        break;
                    };
                    if let Err(reason) = cancel.check() {
                        if let Ok(mut stopped) = stopped.lock() {
                            stopped.get_or_insert(reason);
                        }
                        break;
                    }
                    let result = self.resolver.resolve_batch(dataset, cells);
                    if let Ok(mut results) = results.lock() {
                        results[index] = Some(result);
                    }
                });
            }
        });

        if let Some(reason) = stopped.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(reason);
        }
        let results = results.into_inner().unwrap_or_else(|p| p.into_inner());
        Ok(groups
            .into_iter()
            .zip(results)
            .map(|((dataset, cells), result)| {
                let result = result.unwrap_or_else(|| Err(ResolveError::new(dataset.clone(), "batch worker did not report")));
                (dataset, cells, result)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::testing::TableResolver;
    use crate::link::Link;

    fn table() -> TableResolver {
        TableResolver::default()
            .with("st-1", "stations", "name", Value::String("Central".into()))
            .with("st-1", "stations", "operator", Value::Reference("op-1".into()))
            .with("st-2", "stations", "name", Value::String("North".into()))
            .with("st-2", "stations", "operator", Value::Reference("op-1".into()))
            .with("op-1", "operators", "name", Value::String("Metro".into()))
    }

    fn key(dataset: &str, schema: &str, field: &str) -> CellKey {
        CellKey {
            dataset: dataset.into(),
            schema: schema.into(),
            field: field.into(),
        }
    }

    #[test]
    fn test_one_batch_per_dataset_and_cell_once() {
        let resolver = table();
        let chains = vec![
            Links::single(Link::to_dataset("st-1", "stations", "name")),
            Links::single(Link::to_dataset("st-1", "stations", "name")),
            Links::single(Link::to_dataset("st-2", "stations", "name")),
        ];
        let memo = BatchResolver::new(&resolver).prefetch(&chains, &CancelToken::new()).unwrap();

        let mut calls = resolver.batch_calls();
        calls.sort();
        assert_eq!(calls, vec![DatasetId::new("st-1"), DatasetId::new("st-2")]);
        assert_eq!(memo.stats().cells, 2);
        assert_eq!(
            memo.resolve_cell(&key("st-1", "stations", "name")).unwrap(),
            Some(Value::String("Central".into()))
        );
    }

    #[test]
    fn test_chains_follow_references_across_rounds() {
        let resolver = table();
        let chain = |row: &str| {
            Links::new(vec![
                Link::to_dataset(row, "stations", "operator"),
                Link::contextual("operators", "name"),
            ])
        };
        let memo = BatchResolver::new(&resolver)
            .prefetch(&[chain("st-1"), chain("st-2")], &CancelToken::new())
            .unwrap();

        assert_eq!(memo.stats().rounds, 2);
        // both stations point at op-1: one batch, one cell in round two
        assert_eq!(resolver.batch_calls().iter().filter(|d| d.as_str() == "op-1").count(), 1);
        assert_eq!(
            memo.get(&key("op-1", "operators", "name")),
            Some(Some(&Value::String("Metro".into())))
        );
    }

    #[test]
    fn test_missing_cells_are_memoized_as_absent() {
        let resolver = table();
        let chains = vec![Links::single(Link::to_dataset("gone", "stations", "name"))];
        let memo = BatchResolver::new(&resolver).prefetch(&chains, &CancelToken::new()).unwrap();
        assert_eq!(memo.get(&key("gone", "stations", "name")), Some(None));
        assert_eq!(memo.resolve_cell(&key("gone", "stations", "name")).unwrap(), None);
    }

    #[test]
    fn test_failed_dataset_is_recorded_not_fatal() {
        let resolver = table().failing("st-2");
        let chains = vec![
            Links::single(Link::to_dataset("st-1", "stations", "name")),
            Links::single(Link::to_dataset("st-2", "stations", "name")),
        ];
        let memo = BatchResolver::new(&resolver).prefetch(&chains, &CancelToken::new()).unwrap();
        assert!(memo.failure(&DatasetId::new("st-2")).is_some());
        assert_eq!(memo.stats().failed_datasets, 1);
        assert!(memo.resolve_cell(&key("st-2", "stations", "name")).is_err());
        assert!(memo.resolve_cell(&key("st-1", "stations", "name")).is_ok());
    }

    #[test]
    fn test_cancelled_token_stops_pass() {
        let resolver = table();
        let token = CancelToken::new();
        token.cancel();
        let chains = vec![Links::single(Link::to_dataset("st-1", "stations", "name"))];
        let result = BatchResolver::new(&resolver).prefetch(&chains, &token);
        assert_eq!(result.unwrap_err(), Cancelled::Requested);
        assert!(resolver.batch_calls().is_empty());
    }

    #[test]
    fn test_worker_pool_matches_inline() {
        let resolver = table();
        let chains: Vec<Links> = ["st-1", "st-2", "op-1"]
            .iter()
            .map(|row| Links::single(Link::to_dataset(*row, "stations", "name")))
            .collect();
        let inline = BatchResolver::new(&resolver).prefetch(&chains, &CancelToken::new()).unwrap();
        let pooled = BatchResolver::new(&resolver)
            .with_workers(4)
            .prefetch(&chains, &CancelToken::new())
            .unwrap();
        assert_eq!(inline.stats(), pooled.stats());
        for chain in &chains {
            let cell = chain.cell_at(0, None).unwrap();
            assert_eq!(inline.get(&cell), pooled.get(&cell));
        }
    }

    #[test]
    fn test_max_depth_bounds_rounds() {
        let resolver = table();
        let chain = Links::new(vec![
            Link::to_dataset("st-1", "stations", "operator"),
            Link::contextual("operators", "name"),
        ]);
        let memo = BatchResolver::new(&resolver)
            .with_max_depth(1)
            .prefetch(&[chain], &CancelToken::new())
            .unwrap();
        assert_eq!(memo.stats().rounds, 1);
        assert_eq!(memo.get(&key("op-1", "operators", "name")), None);
    }
}
