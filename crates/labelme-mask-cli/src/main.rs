// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use labelme_mask::{
    AnnotationDocument, ConvertOptions, DEFAULT_RESIZE_FACTOR, Error, MaskWriteOptions,
    MaskWriter, RasterStrategy, convert_file, label_shapes,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scale applied to the image and to every polygon before rasterizing.
    #[clap(long, env = "LABELME_MASK_RESIZE_FACTOR", default_value_t = DEFAULT_RESIZE_FACTOR, global = true)]
    resize_factor: f64,

    /// Pixel scan strategy: "bbox" tests only each polygon's bounding box,
    /// "full" tests every pixel.  Both produce identical masks.
    #[clap(long, env = "LABELME_MASK_STRATEGY", default_value = "bbox", global = true)]
    strategy: RasterStrategy,

    /// Compute polygon coverage on all cores.
    #[clap(long, env = "LABELME_MASK_PARALLEL", global = true)]
    parallel: bool,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Convert one LabelMe JSON document into `<stem>_mask.png`,
    /// `<stem>_image.png` and `<stem>_labels.json`.
    Convert {
        /// LabelMe JSON document
        input: PathBuf,

        /// Output directory, defaults to the current working directory.
        #[clap(long)]
        output: Option<PathBuf>,

        /// Skip writing the resampled image.
        #[clap(long)]
        no_image: bool,
    },
    /// Convert every `*.json` document found under a directory.  The
    /// directory layout is mirrored in the output directory.
    Batch {
        /// Directory searched recursively for LabelMe JSON documents
        input: PathBuf,

        /// Output directory, defaults to the current working directory.
        #[clap(long)]
        output: Option<PathBuf>,

        /// Skip writing the resampled images.
        #[clap(long)]
        no_image: bool,
    },
    /// Print the label vocabulary of a document, one `index: name` per line.
    Labels {
        /// LabelMe JSON document
        input: PathBuf,
    },
}

fn init_logging() {
    #[cfg(feature = "profiling")]
    {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    #[cfg(not(feature = "profiling"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn file_stem(path: &Path) -> Result<String, Error> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| Error::InvalidParameters(format!("{} has no file name", path.display())))
}

fn handle_convert(
    options: &ConvertOptions,
    input: PathBuf,
    output: PathBuf,
    no_image: bool,
) -> Result<(), Error> {
    let conversion = convert_file(&input, options)?;
    let writer = MaskWriter::with_options(MaskWriteOptions {
        write_image: !no_image,
        ..Default::default()
    });
    let files = writer.write(&conversion, &output, &file_stem(&input)?)?;

    println!(
        "Converted {} -> {} ({}x{}, {} labels)",
        input.display(),
        files.mask.display(),
        conversion.mask.width(),
        conversion.mask.height(),
        conversion.label_vocabulary.len()
    );
    Ok(())
}

fn find_documents(dir: &Path) -> Vec<PathBuf> {
    let mut documents: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .filter(|e| !is_written_vocabulary(e.path()))
        .map(|e| e.into_path())
        .collect();
    documents.sort();
    documents
}

/// True for a `<stem>_labels.json` written by an earlier run, recognised by
/// the `<stem>_mask.png` written beside it.
fn is_written_vocabulary(path: &Path) -> bool {
    let Some(stem) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix("_labels.json"))
    else {
        return false;
    };

    let written = path.with_file_name(format!("{}_mask.png", stem)).is_file();
    if written {
        log::debug!("Skipping {}, written by an earlier run", path.display());
    }
    written
}

/// Converts every document under `input`, returning the number of failures.
fn handle_batch(
    options: &ConvertOptions,
    input: PathBuf,
    output: PathBuf,
    no_image: bool,
) -> Result<usize, Error> {
    use indicatif::{ProgressBar, ProgressStyle};

    if !input.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "{} is not a directory",
            input.display()
        )));
    }

    let documents = find_documents(&input);
    log::info!(
        "Found {} documents under {}",
        documents.len(),
        input.display()
    );

    let bar = ProgressBar::new(documents.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Converting");

    let writer = MaskWriter::with_options(MaskWriteOptions {
        write_image: !no_image,
        ..Default::default()
    });

    let convert_one = |path: &PathBuf| -> Result<(), Error> {
        let relative = path.strip_prefix(&input).unwrap_or(path);
        let dir = match relative.parent() {
            Some(parent) => output.join(parent),
            None => output.clone(),
        };
        let conversion = convert_file(path, options)?;
        writer.write(&conversion, dir, &file_stem(path)?)?;
        Ok(())
    };

    let failures: Vec<(PathBuf, Error)> = documents
        .par_iter()
        .filter_map(|path| {
            let result = convert_one(path);
            bar.inc(1);
            result.err().map(|err| (path.clone(), err))
        })
        .collect();

    bar.finish_with_message("Done");

    for (path, err) in &failures {
        log::error!("{}: {}", path.display(), err);
    }

    println!(
        "Converted {} of {} documents into {}",
        documents.len() - failures.len(),
        documents.len(),
        output.display()
    );

    Ok(failures.len())
}

fn handle_labels(input: PathBuf) -> Result<(), Error> {
    let document = AnnotationDocument::read_json(&input)?;
    let (vocabulary, _) = label_shapes(&document.shapes)?;
    for (index, name) in vocabulary.iter() {
        println!("{}: {}", index, name);
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    init_logging();

    let args = Args::parse();
    let options = ConvertOptions::default()
        .with_resize_factor(args.resize_factor)
        .with_strategy(args.strategy)
        .with_parallel(args.parallel);

    log::debug!("Conversion options: {:?}", options);

    match args.cmd {
        Command::Convert {
            input,
            output,
            no_image,
        } => {
            let output = output.unwrap_or_else(|| ".".into());
            handle_convert(&options, input, output, no_image)
        }
        Command::Batch {
            input,
            output,
            no_image,
        } => {
            let output = output.unwrap_or_else(|| ".".into());
            let failed = handle_batch(&options, input, output, no_image)?;
            if failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Labels { input } => handle_labels(input),
    }
}
