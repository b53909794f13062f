/*!
# CSV input and output

Reads fits from Stan style CSV output and writes tables back out as CSV.
Enabled by the `csv` feature (on by default).

A Stan CSV file holds one chain.  Lines starting with `#` carry the run
configuration (`model`, `num_warmup`, `save_warmup`, `seed`, ...) and the
elapsed times; the header row names the columns.  Columns ending in `__`
other than `lp__` are sampler diagnostics; everything else is a parameter
component written as `theta.1`, `Sigma.2.1` or `Sigma[2,1]`.
*/

use crate::error::FitError;
use crate::fit::{FitResult, FitResultBuilder, InferenceMode};
use crate::metadata::ElapsedTime;
use crate::names::{flatten_names, ParamSpec};
use crate::table::Table;
use csv::{ReaderBuilder, Writer};
use ndarray::Array2;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

impl Table {
    /// Writes the table as CSV: a header with an empty first cell followed
    /// by the column labels, then one record per row led by its label.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), FitError> {
        let mut wtr = Writer::from_writer(writer);
        let mut header = vec![String::new()];
        header.extend(self.col_names.iter().cloned());
        wtr.write_record(&header).map_err(std::io::Error::from)?;
        for (name, row) in self.row_names.iter().zip(self.values.outer_iter()) {
            let mut record = vec![name.clone()];
            record.extend(row.iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(std::io::Error::from)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file, see [`write_csv`](Self::write_csv).
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), FitError> {
        self.write_csv(fs::File::create(path)?)
    }
}

/// Configuration and timing found in the comment lines of one file.
#[derive(Debug, Default, Clone, PartialEq)]
struct CsvComments {
    model: Option<String>,
    variational: bool,
    num_warmup: usize,
    save_warmup: bool,
    seed: Option<u64>,
    elapsed: ElapsedTime,
}

impl CsvComments {
    /// Settings that must agree between the chains of one run.
    fn layout(&self) -> (bool, usize, bool) {
        (self.variational, self.num_warmup, self.save_warmup)
    }
}

fn parse_comments(text: &str, path: &str) -> Result<CsvComments, FitError> {
    let invalid = |key: &str, value: &str| FitError::StanCsv {
        path: path.to_string(),
        reason: format!("cannot parse `{} = {}`", key, value),
    };
    let mut comments = CsvComments::default();
    for line in text.lines() {
        let line = match line.strip_prefix('#') {
            Some(rest) => rest.trim(),
            None => continue,
        };
        if line.ends_with("seconds (Warm-up)") {
            comments.elapsed.warmup = leading_seconds(line);
            continue;
        }
        if line.ends_with("seconds (Sampling)") {
            comments.elapsed.sampling = leading_seconds(line);
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => continue,
        };
        let value = value.trim_end_matches("(Default)").trim();
        match key {
            "model" => comments.model = Some(value.to_string()),
            "method" => comments.variational = value.starts_with("variational"),
            "num_warmup" => {
                comments.num_warmup = value.parse().map_err(|_| invalid(key, value))?
            }
            "save_warmup" => {
                comments.save_warmup = match value {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    _ => return Err(invalid(key, value)),
                }
            }
            "seed" => comments.seed = Some(value.parse().map_err(|_| invalid(key, value))?),
            _ => {}
        }
    }
    Ok(comments)
}

/// Seconds in lines like `Elapsed Time: 0.05 seconds (Warm-up)`.
fn leading_seconds(line: &str) -> f64 {
    let line = line.trim_start_matches("Elapsed Time:").trim();
    line.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

/// Splits `theta.2.1` or `theta[2,1]` into its name and 1-based indices.
fn split_column_name(column: &str) -> Option<(String, Vec<usize>)> {
    let (name, rest) = match column.find(|c: char| c == '.' || c == '[') {
        Some(i) => (&column[..i], &column[i..]),
        None => return Some((column.to_string(), Vec::new())),
    };
    let indices = rest
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == '.' || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<usize>().ok().filter(|&i| i > 0))
        .collect::<Option<Vec<_>>>()?;
    Some((name.to_string(), indices))
}

fn is_sampler_column(name: &str) -> bool {
    name.ends_with("__") && name != "lp__"
}

/// Declared parameters in order of first appearance, each with the largest
/// index seen along every axis as its shape.
fn infer_params(columns: &[&str], path: &str) -> Result<Vec<ParamSpec>, FitError> {
    let mut params: Vec<ParamSpec> = Vec::new();
    for column in columns {
        let (name, indices) = split_column_name(column).ok_or_else(|| FitError::StanCsv {
            path: path.to_string(),
            reason: format!("cannot parse column name `{}`", column),
        })?;
        match params.iter_mut().find(|p| p.name == name) {
            Some(p) if p.dims.len() == indices.len() => {
                for (d, i) in p.dims.iter_mut().zip(&indices) {
                    *d = (*d).max(*i);
                }
            }
            Some(_) => {
                return Err(FitError::StanCsv {
                    path: path.to_string(),
                    reason: format!("`{}` is used with different numbers of indices", name),
                })
            }
            None => params.push(ParamSpec::array(name, &indices)),
        }
    }
    Ok(params)
}

/// Canonical flat name of a CSV column, e.g. `theta.2.1` → `theta[2,1]`.
fn canonical_name(column: &str) -> Option<String> {
    let (name, indices) = split_column_name(column)?;
    if indices.is_empty() {
        return Some(name);
    }
    let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    Some(format!("{}[{}]", name, parts.join(",")))
}

struct ChainCsv {
    comments: CsvComments,
    header: Vec<String>,
    rows: Vec<Vec<f64>>,
}

fn read_chain(path: &Path) -> Result<ChainCsv, FitError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path)?;
    let comments = parse_comments(&text, &display)?;
    let mut rdr = ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let header: Vec<String> = rdr
        .headers()
        .map_err(std::io::Error::from)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(std::io::Error::from)?;
        let row = record
            .iter()
            .map(|cell| cell.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| FitError::StanCsv {
                path: display.clone(),
                reason: format!("draw {}: {}", line + 1, e),
            })?;
        rows.push(row);
    }
    if comments.variational && !rows.is_empty() {
        // the first row holds the mean of the approximation
        rows.remove(0);
    }
    log::debug!("read {} draws from {}", rows.len(), display);
    Ok(ChainCsv {
        comments,
        header,
        rows,
    })
}

/// Reads one Stan CSV file per chain into a fit.
///
/// Warmup draws count as warmup only when the files were written with
/// `save_warmup` set; otherwise every row is a post-warmup draw.  Column
/// order inside each chain is normalized to the row-major flat order.
pub fn read_stan_csv<P: AsRef<Path>>(paths: &[P]) -> Result<FitResult, FitError> {
    let chains = paths
        .iter()
        .map(|p| read_chain(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let first = chains
        .first()
        .ok_or_else(|| FitError::InvalidLayout("no CSV files given".into()))?;
    let first_path = paths[0].as_ref().display().to_string();

    let param_columns: Vec<&str> = first
        .header
        .iter()
        .map(|h| h.as_str())
        .filter(|h| !is_sampler_column(h))
        .collect();
    let params = infer_params(&param_columns, &first_path)?;
    let flat_names = flatten_names(&params);

    let comments = &first.comments;
    let warmup = if comments.save_warmup && !comments.variational {
        comments.num_warmup
    } else {
        0
    };
    let mode = if comments.variational {
        InferenceMode::Variational
    } else {
        InferenceMode::Mcmc
    };

    let mut builder = FitResultBuilder::new(params)
        .mode(mode)
        .warmup(warmup)
        .model_name(comments.model.clone().unwrap_or_default())
        .seed(comments.seed.unwrap_or_default());
    let mut sampler_tables = Vec::with_capacity(chains.len());
    let mut elapsed = Vec::with_capacity(chains.len());

    for (chain, path) in chains.iter().zip(paths) {
        let path = path.as_ref().display().to_string();
        if chain.comments.layout() != comments.layout() {
            return Err(FitError::StanCsv {
                path,
                reason: format!(
                    "method or warmup settings differ from {}",
                    first_path
                ),
            });
        }
        let by_name: HashMap<String, usize> = chain
            .header
            .iter()
            .enumerate()
            .filter(|(_, h)| !is_sampler_column(h))
            .filter_map(|(i, h)| Some((canonical_name(h)?, i)))
            .collect();
        let draw_cols = flat_names
            .iter()
            .map(|name| {
                by_name.get(name).copied().ok_or_else(|| FitError::StanCsv {
                    path: path.clone(),
                    reason: format!("missing column for `{}`", name),
                })
            })
            .collect::<Result<Vec<usize>, _>>()?;
        let sampler_cols: Vec<usize> = (0..chain.header.len())
            .filter(|&i| is_sampler_column(&chain.header[i]))
            .collect();

        let width = chain.header.len();
        if let Some(bad) = chain.rows.iter().position(|r| r.len() != width) {
            return Err(FitError::StanCsv {
                path,
                reason: format!("draw {} has {} cells, expected {}", bad + 1, chain.rows[bad].len(), width),
            });
        }
        let n = chain.rows.len();
        let draws = Array2::from_shape_fn((n, draw_cols.len()), |(i, j)| chain.rows[i][draw_cols[j]]);
        let sampler = Array2::from_shape_fn((n, sampler_cols.len()), |(i, j)| {
            chain.rows[i][sampler_cols[j]]
        });
        let sampler_names = sampler_cols.iter().map(|&i| chain.header[i].clone()).collect();

        builder = builder.chain(draws);
        if !sampler_cols.is_empty() {
            sampler_tables.push(Table::with_numbered_rows(sampler_names, sampler)?);
        }
        elapsed.push(chain.comments.elapsed);
    }

    builder
        .sampler_params(sampler_tables)
        .elapsed_time(elapsed)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::fs;
    use tempfile::TempDir;

    const CHAIN_1: &str = "\
# model = eight_schools_model
# method = sample (Default)
#   sample
#     num_samples = 3
#     num_warmup = 2
#     save_warmup = 1
# random
#   seed = 4711
lp__,accept_stat__,treedepth__,divergent__,energy__,mu,Sigma.1.1,Sigma.2.1,Sigma.1.2,Sigma.2.2
# Adaptation terminated
-1.5,0.9,2,0,3.1,0.10,11,21,12,22
-1.4,0.8,3,0,3.0,0.20,11,21,12,22
-1.3,0.7,2,1,2.9,0.30,11,21,12,22
-1.2,0.95,3,0,2.8,0.40,11,21,12,22
-1.1,0.85,2,0,2.7,0.50,11,21,12,22
#
#  Elapsed Time: 0.05 seconds (Warm-up)
#                0.125 seconds (Sampling)
#                0.175 seconds (Total)
#
";

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_column_names() {
        assert_eq!(split_column_name("mu"), Some(("mu".to_string(), vec![])));
        assert_eq!(split_column_name("Sigma.2.1"), Some(("Sigma".to_string(), vec![2, 1])));
        assert_eq!(split_column_name("Sigma[2,1]"), Some(("Sigma".to_string(), vec![2, 1])));
        assert_eq!(split_column_name("theta.x"), None);
        assert_eq!(canonical_name("theta.3").as_deref(), Some("theta[3]"));
        assert!(is_sampler_column("divergent__"));
        assert!(!is_sampler_column("lp__"));
    }

    #[test]
    fn test_comments() {
        let comments = parse_comments(CHAIN_1, "c1.csv").unwrap();
        assert_eq!(comments.model.as_deref(), Some("eight_schools_model"));
        assert_eq!(comments.num_warmup, 2);
        assert!(comments.save_warmup);
        assert!(!comments.variational);
        assert_eq!(comments.seed, Some(4711));
        assert_eq!(comments.elapsed, ElapsedTime::new(0.05, 0.125));
    }

    #[test]
    fn test_read_two_chains() {
        let dir = TempDir::new().unwrap();
        let chain_2 = CHAIN_1.replace("0.10,11", "1.10,11").replace("0.125 seconds", "0.25 seconds");
        let paths = vec![write(&dir, "c1.csv", CHAIN_1), write(&dir, "c2.csv", &chain_2)];
        let fit = read_stan_csv(&paths).unwrap();

        assert_eq!(fit.model_name(), "eight_schools_model");
        assert_eq!(fit.seed(), 4711);
        assert_eq!(fit.num_chains(), 2);
        assert_eq!(fit.iterations(), 5);
        assert_eq!(fit.warmup(), 2);
        assert_eq!(fit.param_names(), vec!["lp__", "mu", "Sigma"]);
        assert_eq!(fit.dims("Sigma"), Some(&[2, 2][..]));
        // columns are reordered to row-major
        let sigma = fit.extract_matrix(&["Sigma"]).unwrap();
        assert_eq!(sigma.names, vec!["Sigma[1,1]", "Sigma[1,2]", "Sigma[2,1]", "Sigma[2,2]"]);
        assert_eq!(sigma.draws.row(0).to_vec(), vec![11.0, 12.0, 21.0, 22.0]);

        let mu = fit.extract_per_chain(&["mu"], true).unwrap();
        assert_eq!(mu.draws[[0, 1, 0]], 1.10);
        assert_eq!(fit.extract_matrix(&["mu"]).unwrap().draws.nrows(), 6);

        let sampler = fit.sampler_params(false);
        assert_eq!(sampler[0].col_names(), &["accept_stat__", "treedepth__", "divergent__", "energy__"]);
        assert_eq!(sampler[0].nrows(), 3);
        assert_eq!(fit.num_divergent().unwrap(), 2);
        assert_eq!(fit.elapsed_time().get("chain:2", "sample"), Some(0.25));
    }

    #[test]
    fn test_variational_file_drops_mean_row() {
        let dir = TempDir::new().unwrap();
        let text = "\
# method = variational
lp__,log_p__,log_g__,mu
0,0,0,0.5
0,-1.2,-0.3,0.4
0,-1.1,-0.2,0.6
0,-1.3,-0.4,0.7
";
        let fit = read_stan_csv(&[write(&dir, "vb.csv", text)]).unwrap();
        assert_eq!(fit.mode(), InferenceMode::Variational);
        assert_eq!(fit.iterations(), 3);
        assert_eq!(
            fit.extract_matrix(&["mu"]).unwrap().draws,
            array![[0.4], [0.6], [0.7]]
        );
    }

    #[test]
    fn test_malformed_files() {
        let dir = TempDir::new().unwrap();
        let bad_cell = write(&dir, "bad.csv", "mu,divergent__\n0.1,0\nabc,0\n");
        assert!(matches!(read_stan_csv(&[bad_cell]), Err(FitError::StanCsv { .. })));

        let short = write(&dir, "short.csv", "mu,divergent__\n0.1,0\n0.2,0\n");
        let long = write(&dir, "long.csv", "mu,divergent__\n0.1,0\n0.2,0\n0.3,0\n");
        assert!(matches!(
            read_stan_csv(&[short, long]),
            Err(FitError::InconsistentChainShape { chain: 1, .. })
        ));

        let none: Vec<std::path::PathBuf> = vec![];
        assert!(read_stan_csv(&none).is_err());
    }

    #[test]
    fn test_unparsable_settings() {
        let dir = TempDir::new().unwrap();
        let bad_warmup = CHAIN_1.replace("num_warmup = 2", "num_warmup = abc");
        let err = read_stan_csv(&[write(&dir, "w.csv", &bad_warmup)]).unwrap_err();
        assert!(matches!(
            err,
            FitError::StanCsv { reason, .. } if reason.contains("num_warmup = abc")
        ));

        let bad_seed = CHAIN_1.replace("seed = 4711", "seed = -1");
        assert!(matches!(
            read_stan_csv(&[write(&dir, "s.csv", &bad_seed)]),
            Err(FitError::StanCsv { .. })
        ));

        let bad_flag = CHAIN_1.replace("save_warmup = 1", "save_warmup = maybe");
        assert!(parse_comments(&bad_flag, "f.csv").is_err());
    }

    #[test]
    fn test_chains_with_different_settings() {
        let dir = TempDir::new().unwrap();
        let no_warmup_saved = CHAIN_1.replace("save_warmup = 1", "save_warmup = 0");
        let paths = vec![
            write(&dir, "c1.csv", CHAIN_1),
            write(&dir, "c2.csv", &no_warmup_saved),
        ];
        let err = read_stan_csv(&paths).unwrap_err();
        assert!(matches!(
            err,
            FitError::StanCsv { path, .. } if path.ends_with("c2.csv")
        ));
    }

    #[test]
    fn test_write_table() {
        let table = Table::new(
            vec!["mu".to_string(), "tau".to_string()],
            vec!["mean".to_string(), "50%".to_string()],
            array![[1.5, 1.0], [2.0, 2.25]],
        )
        .unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ",mean,50%\nmu,1.5,1\ntau,2,2.25\n"
        );

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        table.save_csv(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with(",mean,50%"));
    }
}
