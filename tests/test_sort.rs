use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use line_file_sort::config::{ColumnFallback, Config};
use line_file_sort::field::extract_key;
use line_file_sort::partition_store::MemoryPartitionStore;
use line_file_sort::sort::{Outcome, Sort};
use line_file_sort::source::{LineSource, WriteSink};

mod common;

fn sort_lines(config: Config, input: &[&str]) -> Result<Vec<String>, anyhow::Error> {
    let mut output: Vec<String> = Vec::new();
    Sort::new(config)?.sort(LineSource::from_lines(common::lines(input)), &mut output)?;
    Ok(output)
}

#[test]
fn test_numeric() -> Result<(), anyhow::Error> {
    let output = sort_lines(Config::default().with_numeric(true), &["10", "2", "1", "20"])?;
    assert_eq!(output, common::lines(&["1", "2", "10", "20"]));
    Ok(())
}

#[test]
fn test_month() -> Result<(), anyhow::Error> {
    let output = sort_lines(Config::default().with_month(true), &["Mar", "Jan", "Dec"])?;
    assert_eq!(output, common::lines(&["Jan", "Mar", "Dec"]));
    Ok(())
}

#[test]
fn test_human_size() -> Result<(), anyhow::Error> {
    let output = sort_lines(Config::default().with_human_size(true), &["1K", "2M", "512", "3G"])?;
    assert_eq!(output, common::lines(&["512", "1K", "2M", "3G"]));
    Ok(())
}

#[test]
fn test_column_out_of_range() -> Result<(), anyhow::Error> {
    assert_eq!(extract_key("a b c", 4, " "), "a b c");
    let config = Config::default().with_column(4).with_delimiter(" ");
    let output = sort_lines(config, &["c b a", "a b c"])?;
    assert_eq!(output, common::lines(&["a b c", "c b a"]));

    // with the empty fallback short lines come first
    let config = Config::default()
        .with_column(2)
        .with_delimiter(" ")
        .with_column_fallback(ColumnFallback::Empty);
    let output = sort_lines(config, &["x b", "z", "y a"])?;
    assert_eq!(output, common::lines(&["z", "y a", "x b"]));
    Ok(())
}

#[test]
fn test_malformed_keys_last() -> Result<(), anyhow::Error> {
    let output = sort_lines(Config::default().with_numeric(true), &["b", "3", "a", "1"])?;
    assert_eq!(output, common::lines(&["1", "3", "a", "b"]));
    let output = sort_lines(Config::default().with_numeric(true).with_reverse(true), &["b", "3", "a", "1"])?;
    assert_eq!(output, common::lines(&["b", "a", "3", "1"]));
    Ok(())
}

#[test]
fn test_ignored_lines() -> Result<(), anyhow::Error> {
    let config = Config::default()
        .with_ignore_empty(true)
        .with_ignore_lines(Regex::new("^#")?);
    let output = sort_lines(config, &["b", "", "# comment", "a"])?;
    assert_eq!(output, common::lines(&["a", "b"]));
    Ok(())
}

#[test]
fn test_trailing_blanks() -> Result<(), anyhow::Error> {
    let config = Config::default()
        .with_unique(true)
        .with_ignore_trailing_blanks(true);
    let output = sort_lines(config, &["a \t", "b", "a"])?;
    assert_eq!(output, common::lines(&["a \t", "b"]));
    Ok(())
}

#[test]
fn test_run_sorts() -> Result<(), anyhow::Error> {
    let sort = Sort::new(Config::default().with_unique(true))?;
    let mut output: Vec<String> = Vec::new();
    let outcome = sort.run(LineSource::from_lines(common::lines(&["b", "a", "b"])), &mut output)?;
    assert_eq!(outcome, Outcome::Sorted { lines: 2 });
    assert_eq!(output, common::lines(&["a", "b"]));
    Ok(())
}

#[test]
fn test_file_sort_by_column() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = PathBuf::from("./tests/fixtures/sorted-1000.dat");
    let random_path = common::temp_file_name("./target/results/");
    let small_path = common::temp_file_name("./target/results/");
    let large_path = common::temp_file_name("./target/results/");
    common::write_lines(&random_path, &common::shuffled_lines(&input_path, 5)?)?;

    for (column, numeric, human_size, month) in [(5, true, false, false), (2, false, true, false), (3, false, false, true), (4, false, false, false)] {
        let config = Config::default()
            .with_column(column)
            .with_numeric(numeric)
            .with_human_size(human_size)
            .with_month(month)
            .with_tmp_dir(PathBuf::from("./target/results/"));

        let mut small_sink = WriteSink::create(&small_path)?;
        Sort::new(config.clone())?.sort(LineSource::from_path(&random_path)?, &mut small_sink)?;
        drop(small_sink);

        let store = Arc::new(MemoryPartitionStore::new());
        let mut large_sink = WriteSink::create(&large_path)?;
        Sort::with_store(config.clone().with_max_partition_bytes(3_000).with_tasks(4), store.clone())
            .sort(LineSource::from_path(&random_path)?, &mut large_sink)?;
        drop(large_sink);
        assert!(store.is_empty());

        let small = common::read_lines(&small_path)?;
        let large = common::read_lines(&large_path)?;
        assert_eq!(small.len(), 1000);
        assert_eq!(small, large);
        assert!(Sort::new(config)?.check(LineSource::from_path(&small_path)?)?);
    }

    fs::remove_file(random_path)?;
    fs::remove_file(small_path)?;
    fs::remove_file(large_path)?;
    Ok(())
}

#[test]
fn test_file_sort_restores_fixture() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = Path::new("./tests/fixtures/sorted-1000.dat");
    let random_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_lines(&random_path, &common::shuffled_lines(input_path, 6)?)?;

    let config = Config::default().with_max_partition_bytes(1_000);
    let mut sink = WriteSink::create(&output_path)?;
    let written = Sort::new(config)?.sort(LineSource::from_path(&random_path)?, &mut sink)?;
    drop(sink);
    assert_eq!(written, 1000);
    assert_eq!(fs::read_to_string(&output_path)?, fs::read_to_string(input_path)?);

    fs::remove_file(random_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_missing_input() {
    let result = LineSource::from_path(Path::new("./tests/fixtures/no-such-file.dat"));
    assert!(result.is_err());
}

#[test]
fn test_carriage_returns_survive_partitions() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, b"b\r\r\na\nc\r\n\r\r\n")?;

    let mut small: Vec<String> = Vec::new();
    Sort::new(Config::default())?.sort(LineSource::from_path(&input_path)?, &mut small)?;
    let mut large: Vec<String> = Vec::new();
    Sort::new(Config::default().with_max_partition_bytes(2))?
        .sort(LineSource::from_path(&input_path)?, &mut large)?;

    assert_eq!(small, common::lines(&["\r", "a", "b\r", "c"]));
    assert_eq!(small, large);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_empty_delimiter_splits_characters() -> Result<(), anyhow::Error> {
    let config = Config::default().with_column(2).with_delimiter("");
    let output = sort_lines(config, &["xb", "ya", "zc"])?;
    assert_eq!(output, common::lines(&["ya", "xb", "zc"]));
    Ok(())
}
