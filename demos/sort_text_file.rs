use std::path::{Path, PathBuf};

use anyhow::Error;
use simple_logger::SimpleLogger;

use line_file_sort::config::Config;
use line_file_sort::order::Order;
use line_file_sort::sort::Sort;
use line_file_sort::source::{LineSource, WriteSink};

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn sort_file(config: Config, input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut sink = WriteSink::create(output_path)?;
    let lines = Sort::new(config)?.sort(LineSource::from_path(input_path)?, &mut sink)?;
    log::info!("Wrote {} lines to {}", lines, output_path.display());
    Ok(())
}

fn sort_lines_ascending(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // ascending order is the default
    sort_file(Config::default(), input_path, output_path)
}

fn sort_lines_descending(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    sort_file(Config::default().with_order(Order::Desc), input_path, output_path)
}

fn sort_by_size(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let config = Config::default()
        .with_column(2)
        .with_human_size(true);
    sort_file(config, input_path, output_path)
}

fn sort_by_month_unique(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // one line per month
    let config = Config::default()
        .with_column(3)
        .with_month(true)
        .with_unique(true);
    sort_file(config, input_path, output_path)
}

fn sort_numeric_partitioned(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // small partitions force the external path
    let config = Config::default()
        .with_column(5)
        .with_numeric(true)
        .with_max_partition_bytes(4096)
        .with_tasks(4);
    sort_file(config, input_path, output_path)
}

fn check_sorted(input_path: &Path) -> Result<(), Error> {
    let sorted = Sort::new(Config::default())?.check(LineSource::from_path(input_path)?)?;
    log::info!("{} sorted: {}", input_path.display(), sorted);
    Ok(())
}

// cargo run -r --example sort_text_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;
    let input_path = PathBuf::from("./tests/fixtures/sorted-1000.dat");
    let ascending_path = PathBuf::from("./target/ascending-1000.dat");
    let descending_path = PathBuf::from("./target/descending-1000.dat");
    let sizes_path = PathBuf::from("./target/sizes-1000.dat");
    let months_path = PathBuf::from("./target/months-1000.dat");
    let numbers_path = PathBuf::from("./target/numbers-1000.dat");

    sort_lines_descending(&input_path, &descending_path)?;
    sort_lines_ascending(&descending_path, &ascending_path)?;
    sort_by_size(&input_path, &sizes_path)?;
    sort_by_month_unique(&input_path, &months_path)?;
    sort_numeric_partitioned(&input_path, &numbers_path)?;
    check_sorted(&ascending_path)?;
    check_sorted(&numbers_path)?;

    Ok(())
}
