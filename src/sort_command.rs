use std::cmp::min;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{anyhow, Context};
use command_executor::command::Command;
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;

use crate::config::Config;
use crate::memory_sort::sort_lines;
use crate::partition_store::{PartitionId, PartitionStore};

/// Sorts one partition in place
pub(crate) struct SortCommand {
    partition: PartitionId,
    store: Arc<dyn PartitionStore>,
    config: Arc<Config>,
    errors: Arc<Mutex<Vec<anyhow::Error>>>,
}

impl SortCommand {
    pub(crate) fn new(
        partition: PartitionId,
        store: Arc<dyn PartitionStore>,
        config: Arc<Config>,
        errors: Arc<Mutex<Vec<anyhow::Error>>>,
    ) -> SortCommand {
        SortCommand {
            partition,
            store,
            config,
            errors,
        }
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let result = sort_partition(self.partition, self.store.as_ref(), &self.config)
            .with_context(|| format!("Failed to sort {}", self.partition));
        if let Err(e) = result {
            log::error!("{:#}, thread: {}", e, thread::current().name().unwrap_or("unnamed"));
            // errors are reported to the orchestrator after the pool is joined
            if let Ok(mut errors) = self.errors.lock() {
                errors.push(e);
            }
        }
        Ok(())
    }
}

/// Read a partition, sort it in memory and write it back, returning the number of lines kept.
pub(crate) fn sort_partition(id: PartitionId, store: &dyn PartitionStore, config: &Config) -> Result<usize, anyhow::Error> {
    let lines = store.open_for_read(id)?.collect::<Result<Vec<String>, anyhow::Error>>()?;
    let sorted = sort_lines(lines, config);
    store.overwrite(id, &sorted)?;
    log::debug!("Sorted {}, lines: {}, thread: {}", id, sorted.len(), thread::current().name().unwrap_or("unnamed"));
    Ok(sorted.len())
}

/// Sort every partition, using up to [Config::tasks] worker threads.
///
/// Returns only after every partition has been sorted and written back, or with the first
/// error once all workers finished.
pub(crate) fn sort_partitions(partitions: &[PartitionId], store: &Arc<dyn PartitionStore>, config: &Config) -> Result<(), anyhow::Error> {
    let tasks = min(config.tasks(), partitions.len());
    if tasks <= 1 {
        for id in partitions {
            sort_partition(*id, store.as_ref(), config)
                .with_context(|| format!("Failed to sort {}", id))?;
        }
        return Ok(());
    }

    log::info!("Start sorting {} partitions with {} tasks", partitions.len(), tasks);
    let mut thread_pool_builder = ThreadPoolBuilder::new();
    let mut sorting_pool = thread_pool_builder
        .with_name("sorting".to_string())
        .with_tasks(tasks)
        .with_queue_size(config.queue_size())
        .with_shutdown_mode(ShutdownMode::CompletePending)
        .build()?;

    let shared_config = Arc::new(config.clone());
    let errors = Arc::new(Mutex::new(Vec::new()));
    for id in partitions {
        let sort_command = Box::new(
            SortCommand::new(*id, store.clone(), shared_config.clone(), errors.clone())
        );
        sorting_pool.submit(sort_command);
    }

    log::info!("Shutting down sorting pool");
    sorting_pool.shutdown();
    sorting_pool.join()?;

    let mut errors = errors.lock().map_err(|_| anyhow!("Sort error list lock poisoned"))?;
    if errors.is_empty() {
        log::info!("Finished sorting {} partitions", partitions.len());
        Ok(())
    } else {
        Err(errors.remove(0))
    }
}
