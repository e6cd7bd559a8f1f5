use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs};

use nb_lang_detect::{
    BundledCorpus, CorpusSource, DetectError, DetectionResult, LanguageDetector, TrainConfig, TsvCorpus,
};

const MODEL_DIR_ENV: &str = "NB_LANG_DETECT_MODEL_DIR";
const DEFAULT_MODEL_DIR: &str = "models";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Train,
    Detect,
    Languages,
    Report,
}

#[derive(Debug)]
struct Cli {
    command: Command,
    model_dir: PathBuf,
    corpus: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    json: bool,
    texts: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Cli>, String> {
    let command = match args.next().as_deref() {
        Some("train") => Command::Train,
        Some("detect") => Command::Detect,
        Some("languages") => Command::Languages,
        Some("report") => Command::Report,
        Some("-h") | Some("--help") | None => return Ok(None),
        Some(other) => return Err(format!("unknown command: {other}")),
    };
    let mut cli = Cli {
        command,
        model_dir: env::var_os(MODEL_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
        corpus: None,
        config: None,
        seed: None,
        test_fraction: None,
        json: false,
        texts: Vec::new(),
    };
    while let Some(a) = args.next() {
        match a.as_str() {
            "--model-dir" => cli.model_dir = args.next().ok_or("--model-dir requires a path")?.into(),
            "--corpus" => cli.corpus = Some(args.next().ok_or("--corpus requires a path")?.into()),
            "--config" => cli.config = Some(args.next().ok_or("--config requires a path")?.into()),
            "--seed" => {
                let v = args.next().ok_or("--seed requires a number")?;
                cli.seed = Some(v.parse().map_err(|_| format!("--seed needs an unsigned integer, got {v}"))?);
            }
            "--test-fraction" => {
                let v = args.next().ok_or("--test-fraction requires a number")?;
                cli.test_fraction = Some(v.parse().map_err(|_| format!("--test-fraction needs a number, got {v}"))?);
            }
            "--json" => cli.json = true,
            "-h" | "--help" => return Ok(None),
            other if command == Command::Detect => cli.texts.push(other.to_string()),
            other => log::warn!("extra arg ignored: {other}"),
        }
    }
    Ok(Some(cli))
}

fn print_usage() {
    eprintln!("Usage: nb-lang-detect <train|detect|languages|report> [options]");
    eprintln!("  train                 train on the corpus, save the model, print the summary");
    eprintln!("  detect [TEXT]...      detect each TEXT (one line of stdin each when omitted)");
    eprintln!("  languages             list the languages of the saved model");
    eprintln!("  report                train in memory and print the per-language report");
    eprintln!("Options:");
    eprintln!("  --model-dir DIR       model directory (env {MODEL_DIR_ENV}, default ./{DEFAULT_MODEL_DIR})");
    eprintln!("  --corpus PATH         label<TAB>sentence file instead of the bundled corpus");
    eprintln!("  --config PATH         JSON training config");
    eprintln!("  --seed N              split seed");
    eprintln!("  --test-fraction F     held-out fraction in (0, 1)");
    eprintln!("  --json                print JSON");
}

fn train_config(cli: &Cli) -> nb_lang_detect::Result<TrainConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|e| DetectError::InvalidConfig(format!("{}: {e}", path.display())))?
        }
        None => TrainConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(f) = cli.test_fraction {
        config.test_fraction = f;
    }
    Ok(config)
}

fn corpus_source(cli: &Cli) -> Box<dyn CorpusSource> {
    match &cli.corpus {
        Some(path) => Box::new(TsvCorpus::new(path)),
        None => Box::new(BundledCorpus),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> nb_lang_detect::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| DetectError::Encode(e.to_string()))
}

fn print_detection(text: &str, result: &DetectionResult) {
    match &result.language {
        Some(language) => {
            let top = result
                .top(3)
                .into_iter()
                .map(|(l, p)| format!("{l}={:.2}%", p * 100.0))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{language}\t{:.2}%\t{top}\t{text}", result.confidence * 100.0);
        }
        None => println!("-\t0.00%\t\t{text}"),
    }
}

fn run(cli: Cli) -> nb_lang_detect::Result<()> {
    match cli.command {
        Command::Train => {
            let config = train_config(&cli)?;
            let detector = LanguageDetector::with_model_dir(&cli.model_dir);
            let report = detector.train(corpus_source(&cli).as_ref(), &config)?;
            if cli.json {
                println!("{}", to_json(&report)?);
            } else {
                println!("accuracy\t{:.4}", report.accuracy);
                println!("languages\t{}", report.labels.join(","));
                println!("vocabulary\t{}", report.vocabulary_size);
                println!("train/test\t{}/{}", report.train_size, report.test_size);
                println!("model\t{}", cli.model_dir.display());
            }
        }
        Command::Report => {
            let config = train_config(&cli)?;
            let corpus = corpus_source(&cli).load()?;
            let (_, report) = nb_lang_detect::training::train(&corpus, &config)?;
            if cli.json {
                println!("{}", to_json(&report.report)?);
            } else {
                print!("{}", report.report);
            }
        }
        Command::Languages => {
            let detector = LanguageDetector::with_model_dir(&cli.model_dir);
            detector.ensure_loaded()?;
            let languages = detector.supported_languages();
            if cli.json {
                println!("{}", to_json(&languages)?);
            } else {
                for l in languages {
                    println!("{l}");
                }
            }
        }
        Command::Detect => {
            let detector = LanguageDetector::with_model_dir(&cli.model_dir);
            let texts = if cli.texts.is_empty() {
                io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?
            } else {
                cli.texts
            };
            let results = detector.detect_batch(&texts)?;
            if cli.json {
                println!("{}", to_json(&results)?);
            } else {
                for (text, result) in texts.iter().zip(&results) {
                    print_detection(text, result);
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match parse_args(env::args().skip(1)) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            log::error!("{e}");
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_trained() => {
            log::error!("{e} (run `nb-lang-detect train`)");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
