use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments.
///
/// Everything after the filter name is passed to the filter as its options,
/// even tokens that look like flags.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rusty-filter", version)]
#[command(
    about = "Fit a filter on one dataset and apply it, unchanged, to a second",
    override_usage = "rusty-filter [-j PATH-LIST] -i INPUT1 -o OUTPUT1 [-r INPUT2 -s OUTPUT2] [-c CLASSINDEX] FILTER [FILTER-OPTIONS]..."
)]
pub struct Args {
    /// Resource search path, separated like PATH; inputs not found in the
    /// working directory are looked up here
    #[arg(short = 'j', value_name = "PATH-LIST")]
    pub search_path: Option<String>,

    /// First input dataset; the filter is fitted on it
    #[arg(short = 'i', value_name = "INPUT1")]
    pub input: Option<PathBuf>,

    /// Output for the first dataset
    #[arg(short = 'o', value_name = "OUTPUT1")]
    pub output: Option<PathBuf>,

    /// Second input dataset, filtered with what was learned from the first
    #[arg(short = 'r', value_name = "INPUT2")]
    pub input2: Option<PathBuf>,

    /// Output for the second dataset (required with -r)
    #[arg(short = 's', value_name = "OUTPUT2")]
    pub output2: Option<PathBuf>,

    /// Target column: first, last or a 0-based index (-1: none)
    #[arg(short = 'c', value_name = "CLASSINDEX", allow_hyphen_values = true)]
    pub class_index: Option<String>,

    /// Filter name followed by its options
    #[arg(
        value_name = "FILTER",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub filter: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_options_may_look_like_flags() {
        let args = Args::try_parse_from([
            "rusty-filter", "-i", "a.arff", "-o", "b.arff", "-c", "last", "Normalize", "-S", "2",
            "-T", "-1",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("a.arff")));
        assert_eq!(args.class_index.as_deref(), Some("last"));
        assert_eq!(args.filter, vec!["Normalize", "-S", "2", "-T", "-1"]);
    }

    #[test]
    fn test_negative_class_index() {
        let args = Args::try_parse_from(["rusty-filter", "-c", "-1", "AllFilter"]).unwrap();
        assert_eq!(args.class_index.as_deref(), Some("-1"));
        assert_eq!(args.filter, vec!["AllFilter"]);
    }

    #[test]
    fn test_help_flag() {
        let err = Args::try_parse_from(["rusty-filter", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
