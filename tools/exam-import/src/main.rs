use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::PathBuf;

use docx_exam_parser::StreamEvent;
use exam_model::ParsedDocument;
use import_service::images::sha256_hex;
use import_service::{ImportService, InMemorySubjects, ServiceConfig};
use serde_json::json;

fn print_usage() {
    eprintln!(
        "Usage:\n\
         exam-import template FILE --subject CODE=NAME [--subject ...] [--existing-code CODE ...]\n\
         \x20                        [--image-dir DIR] [--max-bytes N] [--no-images]\n\
         exam-import legacy FILE --subject-id N [--max-bytes N]\n\
         exam-import parse FILE\n\
         exam-import inspect FILE\n\
         \n\
         Environment: EXAM_IMAGE_DIR, EXAM_MAX_DOCUMENT_BYTES, EXAM_WRITE_IMAGES; RUST_LOG (default info)\n"
    );
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Options shared by the subcommands. Unknown flags are ignored.
#[derive(Default)]
struct Opts {
    file: Option<PathBuf>,
    subjects: InMemorySubjects,
    existing_codes: HashSet<String>,
    subject_id: Option<i64>,
    image_dir: Option<PathBuf>,
    max_bytes: Option<usize>,
    no_images: bool,
}

fn parse_opts(args: &[String]) -> Result<Opts, String> {
    let mut opts = Opts::default();
    let mut i = 0;
    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i + 1).cloned().ok_or_else(|| format!("{flag} requires a value"))
    };
    while i < args.len() {
        match args[i].as_str() {
            "--subject" => {
                let v = value(i, "--subject")?;
                let (code, name) = v.split_once('=').unwrap_or((v.as_str(), v.as_str()));
                opts.subjects.insert(code.trim(), name.trim());
                i += 2;
            }
            "--existing-code" => { opts.existing_codes.insert(value(i, "--existing-code")?.to_uppercase()); i += 2; }
            "--subject-id" => {
                let v = value(i, "--subject-id")?;
                opts.subject_id = Some(v.parse().map_err(|_| format!("--subject-id expects a number, got {v}"))?);
                i += 2;
            }
            "--image-dir" => { opts.image_dir = Some(PathBuf::from(value(i, "--image-dir")?)); i += 2; }
            "--max-bytes" => {
                let v = value(i, "--max-bytes")?;
                opts.max_bytes = Some(v.parse().map_err(|_| format!("--max-bytes expects a number, got {v}"))?);
                i += 2;
            }
            "--no-images" => { opts.no_images = true; i += 1; }
            other if !other.starts_with('-') && opts.file.is_none() => { opts.file = Some(PathBuf::from(other)); i += 1; }
            _ => { i += 1; }
        }
    }
    Ok(opts)
}

impl Opts {
    fn config(&self) -> ServiceConfig {
        let mut cfg = ServiceConfig::from_env();
        if let Some(dir) = &self.image_dir { cfg.image_dir = dir.clone(); }
        if let Some(n) = self.max_bytes { cfg.max_document_bytes = n; }
        if self.no_images { cfg.write_images = false; }
        cfg
    }

    fn read_file(&self) -> Result<Vec<u8>, String> {
        let path = self.file.as_ref().ok_or("missing FILE argument")?;
        fs::read(path).map_err(|e| format!("{}: {e}", path.display()))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

fn do_template(args: Vec<String>) -> Result<(), String> {
    let mut opts = parse_opts(&args)?;
    let raw = opts.read_file()?;
    let cfg = opts.config();
    let svc = ImportService::new(cfg, std::mem::take(&mut opts.subjects));
    let plan = svc.plan_template_import(&raw, &opts.existing_codes).map_err(|e| e.to_string())?;
    print_json(&plan)
}

fn do_legacy(args: Vec<String>) -> Result<(), String> {
    let opts = parse_opts(&args)?;
    let subject_id = opts.subject_id.ok_or("legacy requires --subject-id")?;
    let raw = opts.read_file()?;
    let svc = ImportService::new(opts.config(), InMemorySubjects::default());
    let plan = svc.plan_legacy_import(&raw, subject_id).map_err(|e| e.to_string())?;
    print_json(&plan)
}

/// Parse only, with image payloads summarized.
fn do_parse(args: Vec<String>) -> Result<(), String> {
    let opts = parse_opts(&args)?;
    let raw = opts.read_file()?;
    let parsed: ParsedDocument = docx_exam_parser::parse(&raw).map_err(|e| e.to_string())?;
    let images: Vec<_> = parsed
        .questions
        .iter()
        .filter_map(|q| {
            q.image_bytes.as_ref().map(|b| json!({ "sequence_id": q.sequence_id, "len": b.len(), "sha256": sha256_hex(b) }))
        })
        .collect();
    print_json(&json!({ "document": parsed, "images": images }))
}

fn do_inspect(args: Vec<String>) -> Result<(), String> {
    let opts = parse_opts(&args)?;
    let raw = opts.read_file()?;
    let events = docx_exam_parser::read_events(&raw).map_err(|e| e.to_string())?;
    for (i, ev) in events.iter().enumerate() {
        match ev {
            StreamEvent::Text(t) => println!("{i:>4} text  {t:?}"),
            StreamEvent::Image { filename, bytes } => {
                println!("{i:>4} image {filename} len={} sha256={}", bytes.len(), sha256_hex(bytes))
            }
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { print_usage(); return; }
    let cmd = args.remove(0);
    tracing::debug!(command = %cmd, args = args.len(), "exam-import");
    let res = match cmd.as_str() {
        "template" => do_template(args),
        "legacy" => do_legacy(args),
        "parse" => do_parse(args),
        "inspect" => do_inspect(args),
        _ => { print_usage(); return; }
    };
    if let Err(err) = res {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
