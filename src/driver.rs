use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::cli::Args;
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Schema};
use crate::data::saver::save_file;
use crate::error::{DriverError, DriverResult, IndexError};
use crate::filter::options::FilterOptions;
use crate::filter::{registry, Filter};
use crate::session::{split_search_path, Session};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// A validated set of arguments for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub search_path: Vec<PathBuf>,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Second input/output pair, filtered with what was learned on the first.
    pub second: Option<(PathBuf, PathBuf)>,
    /// Target column spec, applied to each dataset. `None` leaves both
    /// datasets without a target.
    pub target: Option<String>,
    pub filter: String,
    pub filter_options: Vec<String>,
}

impl TryFrom<Args> for RunConfig {
    type Error = DriverError;

    /// Checks that need no file access. Nothing is opened if this fails.
    fn try_from(args: Args) -> DriverResult<Self> {
        let config_error = |msg: &str| DriverError::Configuration(msg.to_string());

        let (filter, filter_options) = args
            .filter
            .split_first()
            .ok_or_else(|| config_error("no filter name provided"))?;
        let input = args
            .input
            .ok_or_else(|| config_error("no first input file provided ('-i ...')"))?;
        let output = args
            .output
            .ok_or_else(|| config_error("no first output file provided ('-o ...')"))?;
        let second = match (args.input2, args.output2) {
            (Some(input2), Some(output2)) => Some((input2, output2)),
            (Some(_), None) => return Err(config_error("no second output file provided ('-s ...')")),
            (None, Some(_)) => return Err(config_error("no second input file provided ('-r ...')")),
            (None, None) => None,
        };

        Ok(RunConfig {
            search_path: args
                .search_path
                .as_deref()
                .map(split_search_path)
                .unwrap_or_default(),
            input,
            output,
            second,
            target: target_spec(args.class_index),
            filter: filter.clone(),
            filter_options: filter_options.to_vec(),
        })
    }
}

/// `-c -1` and an absent `-c` both mean "no target column".
fn target_spec(raw: Option<String>) -> Option<String> {
    raw.filter(|s| s.trim() != "-1")
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    /// Target column resolved on the input.
    pub target_index: Option<usize>,
    /// Target column in the filtered output.
    pub output_target_index: Option<usize>,
}

/// Summary of a finished run, logged as JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub filter: String,
    pub options: Vec<String>,
    pub datasets: Vec<DatasetReport>,
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Fit the filter on the first dataset, save it, then push the optional
/// second dataset through the same fitted filter.
pub fn run(config: &RunConfig) -> DriverResult<RunReport> {
    let session = Session::start(&config.search_path);

    // Option errors surface before any data is read.
    let mut filter = registry::create(&config.filter)?;
    filter.configure(FilterOptions::new(config.filter_options.iter().cloned()))?;
    info!("filter: {}", filter.description());

    let mut report = RunReport {
        filter: filter.name().to_string(),
        options: filter.options(),
        datasets: Vec::with_capacity(2),
    };

    let input = session.resolve(&config.input);
    let mut first = load(&input)?;
    let filtered = filter_first(&mut filter, &mut first, config.target.as_deref())?;
    save(&filtered, &config.output)?;
    info!(
        "{} -> {}: {} row(s) in, {} row(s) out",
        input.display(),
        config.output.display(),
        first.len(),
        filtered.len()
    );
    report.datasets.push(dataset_report(&input, &config.output, &first, &filtered));

    if let Some((input2, output2)) = &config.second {
        let input2 = session.resolve(input2);
        let mut second = load(&input2)?;
        let filtered = filter_second(
            &mut filter,
            first.schema(),
            &mut second,
            config.target.as_deref(),
        )?;
        save(&filtered, output2)?;
        info!(
            "{} -> {}: {} row(s) in, {} row(s) out",
            input2.display(),
            output2.display(),
            second.len(),
            filtered.len()
        );
        report.datasets.push(dataset_report(&input2, output2, &second, &filtered));
    }

    Ok(report)
}

/// Resolve the target, negotiate, and filter the dataset the filter learns
/// from.
pub fn filter_first(
    filter: &mut Filter,
    dataset: &mut Dataset,
    target: Option<&str>,
) -> DriverResult<Dataset> {
    apply_target(dataset, target)?;
    let streaming = filter.negotiate_schema(dataset)?;
    debug!(
        "{}: negotiated, {}",
        filter.name(),
        if streaming { "streaming" } else { "buffering" }
    );
    Ok(filter.batch_apply(dataset)?)
}

/// Filter a further dataset with the parameters fitted by [`filter_first`].
///
/// The target spec is resolved again against this dataset. A schema that
/// does not match the first one is logged but still filtered.
pub fn filter_second(
    filter: &mut Filter,
    first_schema: &Schema,
    dataset: &mut Dataset,
    target: Option<&str>,
) -> DriverResult<Dataset> {
    apply_target(dataset, target)?;
    if !first_schema.is_compatible(dataset.schema()) {
        warn!(
            "second dataset '{}' does not match the structure of '{}'",
            dataset.schema().relation,
            first_schema.relation
        );
    }
    Ok(filter.batch_apply(dataset)?)
}

fn apply_target(dataset: &mut Dataset, target: Option<&str>) -> Result<(), IndexError> {
    match target {
        Some(spec) => {
            let index = dataset.resolve_target_index(spec)?;
            debug!("target column: {index}");
        }
        None => dataset.clear_target_index(),
    }
    Ok(())
}

fn load(path: &Path) -> DriverResult<Dataset> {
    load_file(path).map_err(|e| DriverError::io(path, e))
}

fn save(dataset: &Dataset, path: &Path) -> DriverResult<()> {
    save_file(dataset, path).map_err(|e| DriverError::io(path, e))
}

fn dataset_report(input: &Path, output: &Path, before: &Dataset, after: &Dataset) -> DatasetReport {
    DatasetReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows_in: before.len(),
        rows_out: after.len(),
        columns_out: after.column_count(),
        target_index: before.target_index(),
        output_target_index: after.target_index(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;
    use crate::filter::tests::numeric_dataset;

    fn args(tokens: &[&str]) -> Args {
        use clap::Parser;
        Args::try_parse_from(std::iter::once("rusty-filter").chain(tokens.iter().copied()))
            .unwrap()
    }

    fn config_error(tokens: &[&str]) -> String {
        match RunConfig::try_from(args(tokens)) {
            Err(DriverError::Configuration(msg)) => msg,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    const FIRST: &str = "\
@relation train
@attribute x numeric
@attribute y numeric
@attribute class {yes,no}
@data
2,1,yes
4,1,no
6,1,yes
10,1,no
";

    const SECOND: &str = "\
@relation test
@attribute x numeric
@attribute y numeric
@attribute class {yes,no}
@data
0,1,yes
14,1,no
";

    // ---- validation -------------------------------------------------------

    #[test]
    fn test_missing_arguments() {
        assert!(config_error(&["-i", "a.arff", "-o", "b.arff"]).contains("filter name"));
        assert!(config_error(&["-o", "b.arff", "AllFilter"]).contains("'-i"));
        assert!(config_error(&["-i", "a.arff", "AllFilter"]).contains("'-o"));
    }

    #[test]
    fn test_second_pair_must_be_complete() {
        let msg = config_error(&["-i", "a.arff", "-o", "b.arff", "-r", "c.arff", "AllFilter"]);
        assert!(msg.contains("'-s"));
        let msg = config_error(&["-i", "a.arff", "-o", "b.arff", "-s", "d.arff", "AllFilter"]);
        assert!(msg.contains("'-r"));
    }

    #[test]
    fn test_config_from_args() {
        let config = RunConfig::try_from(args(&[
            "-i", "a.arff", "-o", "b.arff", "-r", "c.arff", "-s", "d.arff", "-c", "last",
            "Normalize", "-S", "2",
        ]))
        .unwrap();
        assert_eq!(config.filter, "Normalize");
        assert_eq!(config.filter_options, vec!["-S", "2"]);
        assert_eq!(config.target.as_deref(), Some("last"));
        assert_eq!(
            config.second,
            Some((PathBuf::from("c.arff"), PathBuf::from("d.arff")))
        );
        assert!(config.search_path.is_empty());
    }

    #[test]
    fn test_minus_one_means_no_target() {
        let config =
            RunConfig::try_from(args(&["-i", "a", "-o", "b", "-c", "-1", "AllFilter"])).unwrap();
        assert_eq!(config.target, None);
    }

    #[test]
    fn test_configuration_errors_exit_with_two() {
        let err = RunConfig::try_from(args(&["-i", "a"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    // ---- two-dataset flow --------------------------------------------------

    #[test]
    fn test_second_dataset_uses_first_fit() {
        let mut filter = registry::create("Normalize").unwrap();
        let mut first = numeric_dataset(&[[2.0, 0.0, 0.0], [4.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
        let mut second = numeric_dataset(&[[0.0, 0.0, 0.0], [14.0, 0.0, 0.0]]);

        let out1 = filter_first(&mut filter, &mut first, None).unwrap();
        let out2 = filter_second(&mut filter, first.schema(), &mut second, None).unwrap();

        assert_eq!(out1.rows()[2].get(0), Some(&Value::Number(1.0)));
        assert_eq!(out2.rows()[0].get(0), Some(&Value::Number(-0.25)));
        assert_eq!(out2.rows()[1].get(0), Some(&Value::Number(1.5)));
        assert!(std::sync::Arc::ptr_eq(out1.schema(), out2.schema()));
    }

    #[test]
    fn test_target_is_resolved_per_dataset() {
        let mut filter = registry::create("AllFilter").unwrap();
        let mut first = numeric_dataset(&[[1.0, 2.0, 3.0]]);
        let out = filter_first(&mut filter, &mut first, Some("last")).unwrap();
        assert_eq!(first.target_index(), Some(2));
        assert_eq!(out.target_index(), Some(2));
    }

    #[test]
    fn test_invalid_target_is_runtime_error() {
        let mut filter = registry::create("AllFilter").unwrap();
        let mut first = numeric_dataset(&[[1.0, 2.0, 3.0]]);
        let err = filter_first(&mut filter, &mut first, Some("7")).unwrap_err();
        assert!(matches!(err, DriverError::Index(IndexError::InvalidIndex { .. })));
        assert_eq!(err.exit_code(), 1);
    }

    // ---- end to end ---------------------------------------------------------

    #[test]
    fn test_run_normalize_on_two_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.arff"), FIRST).unwrap();
        std::fs::write(dir.path().join("test.arff"), SECOND).unwrap();
        let out1 = dir.path().join("train-out.csv");
        let out2 = dir.path().join("test-out.csv");

        let config = RunConfig {
            search_path: vec![dir.path().to_path_buf()],
            input: PathBuf::from("train.arff"),
            output: out1.clone(),
            second: Some((PathBuf::from("test.arff"), out2.clone())),
            target: Some("last".into()),
            filter: "weka.filters.unsupervised.attribute.Normalize".into(),
            filter_options: vec![],
        };
        let report = run(&config).unwrap();

        assert_eq!(report.filter, "Normalize");
        assert_eq!(report.options, vec!["-S", "1", "-T", "0"]);
        assert_eq!(report.datasets.len(), 2);
        assert_eq!(report.datasets[1].rows_out, 2);
        assert_eq!(report.datasets[1].target_index, Some(2));
        assert_eq!(report.datasets[1].output_target_index, Some(2));

        let first = std::fs::read_to_string(&out1).unwrap();
        assert_eq!(first, "x,y,class\n0,0,yes\n0.25,0,no\n0.5,0,yes\n1,0,no\n");
        let second = std::fs::read_to_string(&out2).unwrap();
        assert_eq!(second, "x,y,class\n-0.25,0,yes\n1.5,0,no\n");
    }

    #[test]
    fn test_run_reports_missing_input_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            search_path: vec![],
            input: dir.path().join("absent.arff"),
            output: dir.path().join("out.arff"),
            second: None,
            target: None,
            filter: "AllFilter".into(),
            filter_options: vec![],
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
        assert!(err.to_string().contains("absent.arff"));
        assert!(!dir.path().join("out.arff").exists());
    }

    #[test]
    fn test_unknown_option_fails_before_loading() {
        let config = RunConfig {
            search_path: vec![],
            input: PathBuf::from("never-read.arff"),
            output: PathBuf::from("never-written.arff"),
            second: None,
            target: None,
            filter: "Normalize".into(),
            filter_options: vec!["-Z".into()],
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, DriverError::Filter(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
