use std::{
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

mod auxiliary;
mod chapter;
mod extractor;
mod file_type;
mod llm;
mod message;
mod pack;
mod validate;

use crate::{
    auxiliary::CompletionArgs,
    chapter::SourceKind,
    llm::{LLMConstructionOptions, LLMRequestOptions},
    message::{ChatMessageOptions, SystemPromptVariables, UserPromptVariables},
    pack::{ImportantQuestions, PackMeta, StudyPack},
    validate::validate_file_already_exists,
};

/// study pack generation tool powered by artificial intelligence
#[derive(Parser, Validate)]
#[command(name = "notepilot", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate_args: GenerateArgs,
}

#[derive(Clone, Debug, Args, Validate)]
/// Arguments shared by extract and generate commands
pub struct ExtractGenerateArgs {
    // NOTE: Keep these optional to avoid duplicating required args in subcommand usage.
    // We enforce required-ness via validator for generate/extract.
    #[arg(help = "Input chapter file (PDF or plain text)")]
    #[validate(required)]
    input: Option<PathBuf>,

    #[arg(short = 'o', long = "out", help = "Output file path")]
    #[validate(custom(function = "validate_file_already_exists"))]
    #[validate(required)]
    output: Option<PathBuf>,

    #[arg(
        long = "log-level",
        default_value_t = LogLevel::Info,
        help = "Set log level"
    )]
    log_level: LogLevel,

    #[arg(long = "no-progress", help = "Disable progress bar")]
    no_progress: bool,
}

/// Thin wrapper around log levels for clap
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    /// No logging
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract chapter text from a PDF file (alias: ext)
    #[command(name = "extract", alias = "ext")]
    Extract(ExtractArgs),
    /// Generate a study pack from a chapter using LLM (alias: gen)
    #[command(name = "generate", alias = "gen")]
    Generate(GenerateArgs),
    /// Generate shell completion script for specified shell (alias: comp)
    #[command(name = "completion", alias = "comp")]
    Completion(CompletionArgs),
}

#[derive(Clone, Debug, Args, Validate)]
pub struct ExtractArgs {
    #[command(flatten)]
    extract_generate_args: ExtractGenerateArgs,

    #[arg(
        long = "archive-dir",
        help = "Directory to keep a copy of the original PDF"
    )]
    archive_dir: Option<PathBuf>,
}

/// Chapter metadata woven into the prompts and the generated pack
#[derive(Clone, Debug, Args, Validate)]
pub struct ChapterMetaArgs {
    #[arg(long = "grade", help = "Grade level the pack is aimed at")]
    #[validate(required)]
    grade: Option<String>,

    #[arg(long = "subject", help = "Subject the chapter belongs to")]
    #[validate(required)]
    subject: Option<String>,

    #[arg(long = "chapter-title", help = "Title of the chapter")]
    #[validate(required)]
    chapter_title: Option<String>,

    #[arg(
        long = "lang",
        default_value = "English",
        help = "Language for the study pack"
    )]
    language: String,
}

#[derive(Clone, Debug, Args, Validate)]
pub struct GenerateArgs {
    #[command(flatten)]
    extract_generate_args: ExtractGenerateArgs,

    #[command(flatten)]
    meta_args: ChapterMetaArgs,

    #[arg(
        long = "chapter-kind",
        help = "Force how the input file is interpreted"
    )]
    chapter_kind: Option<SourceKind>,

    #[command(flatten)]
    llm_construction_opts: LLMConstructionOptions,

    #[command(flatten)]
    llm_request_opts: LLMRequestOptions,

    #[command(flatten)]
    chat_message_opts: ChatMessageOptions,
}

const EXTRACT_COLOR_HEX: &str = "#F7C5A8";
const GENERATE_COLOR_HEX: &str = "#FF9A76";

static EXTRACT_SPINNER_TEMPLATE: LazyLock<String> =
    LazyLock::new(|| format!("{{spinner:.{EXTRACT_COLOR_HEX}}} {{msg}} [{{elapsed}}]"));
static GENERATE_SPINNER_TEMPLATE: LazyLock<String> =
    LazyLock::new(|| format!("{{spinner:.{GENERATE_COLOR_HEX}}} {{msg}} [{{elapsed}}]"));

/// Result of the extract command
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractReport {
    text: String,
    file_name: String,
    characters_extracted: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        command,
        generate_args,
    } = Cli::parse();

    // Handle auxiliary commands early (e.g., completion)
    // so main stays focused on extract/generate.
    if auxiliary::handle_auxiliary_command(command.as_ref())? {
        return Ok(());
    }

    let extract_generate_args = match &command {
        Some(Command::Extract(args)) => &args.extract_generate_args,
        Some(Command::Generate(args)) => &args.extract_generate_args,
        None => &generate_args.extract_generate_args,
        Some(Command::Completion(_)) => {
            unreachable!("auxiliary commands handled earlier")
        }
    };

    // Enable RUST_LOG environment variable support
    // For developpers, we can set RUST_LOG=debug to see debug logs from dependencies.
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(format!("notepilot={}", extract_generate_args.log_level)),
    )
    .init();

    debug!("Extract/generate arguments: {:?}", extract_generate_args);

    // 0. Validate arguments
    if let Err(err) = extract_generate_args.validate() {
        let missing_input = err.field_errors().contains_key("input");
        let missing_output = err.field_errors().contains_key("output");
        let kind = if missing_input || missing_output {
            ErrorKind::MissingRequiredArgument
        } else {
            ErrorKind::ValueValidation
        };
        Cli::command().error(kind, err.to_string()).exit();
    }

    let input = extract_generate_args
        .input
        .clone()
        .expect("input is required");
    let output = extract_generate_args
        .output
        .clone()
        .expect("output is required");
    let no_progress = extract_generate_args.no_progress;

    if let Some(Command::Extract(ref args)) = command {
        let report = extract_report(&input, args.archive_dir.as_deref(), no_progress).await?;
        info!(
            "Extracted {} characters from '{}'",
            report.characters_extracted, report.file_name
        );
        write_json(&output, &report).await?;
        return Ok(());
    }

    // Note: `notepilot` and `notepilot generate` commands share the same generate_args
    let generate_args = match &command {
        Some(Command::Generate(args)) => args,
        None => &generate_args,
        _ => unreachable!("auxiliary and extract commands handled earlier"),
    };

    if let Err(err) = generate_args.meta_args.validate() {
        let fields = err.field_errors();
        let missing_meta = fields.contains_key("grade")
            || fields.contains_key("subject")
            || fields.contains_key("chapter_title");
        let kind = if missing_meta {
            ErrorKind::MissingRequiredArgument
        } else {
            ErrorKind::ValueValidation
        };
        Cli::command().error(kind, err.to_string()).exit();
    }

    // 1. Resolve chapter text (extract from PDF when needed)
    let chapter_text =
        resolve_chapter_text(&input, generate_args.chapter_kind, no_progress).await?;
    debug!(
        "Resolved chapter text: chars={}",
        chapter_text.chars().count()
    );

    // 2. Generate the study pack
    let study_pack = generate_pack(&chapter_text, generate_args, no_progress).await?;
    info!(
        "Study pack generated with {} note sections and {} important questions",
        study_pack.notes.len(),
        study_pack.important_questions.total()
    );

    // 3. Write output
    write_json(&output, &study_pack).await?;

    Ok(())
}

/// Create parent directories for the given path
async fn create_parent_dirs(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create parent directories for '{path:?}'"))?;
    }
    Ok(())
}

/// Serialize a value as pretty JSON to the output path
async fn write_json<T: serde::Serialize>(output: &Path, value: &T) -> anyhow::Result<()> {
    create_parent_dirs(output).await?;
    let json =
        serde_json::to_string_pretty(value).context("failed to serialize output as JSON")?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("failed to write output to '{output:?}'"))?;
    debug!("Wrote output to path: {output:?}");
    Ok(())
}

/// Create and configure a spinner progress bar
/// NOTE: After calling spinner.set_message, be aware that logging will cause a newline.
fn create_spinner(template: &str, no_progress: bool) -> anyhow::Result<ProgressBar> {
    if no_progress {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(60));
    spinner.set_style(
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    Ok(spinner)
}

/// Run the PDF content-type/size gates and the extractor over the input file
async fn extract_report(
    input: &Path,
    archive_dir: Option<&Path>,
    no_progress: bool,
) -> anyhow::Result<ExtractReport> {
    file_type::ensure_pdf(&input.to_path_buf())?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read PDF file '{input:?}'"))?;
    chapter::ensure_pdf_size(bytes.len())?;

    let bar = create_spinner(EXTRACT_SPINNER_TEMPLATE.as_str(), no_progress)?;
    bar.set_message("Extracting text from PDF...");
    let text = extractor::pdf::extract_text(&bytes);
    if let Err(err) = chapter::ensure_readable(&text) {
        bar.finish_and_clear();
        return Err(err);
    }
    bar.finish_with_message("Extraction completed.");

    // Keep a copy of the original upload when an archive directory is given.
    // An archive failure is logged, not fatal; the extracted text is the goal.
    if let Some(dir) = archive_dir {
        if let Err(err) = archive_original(input, dir).await {
            warn!("failed to archive original PDF: {err:#}");
        }
    }

    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let characters_extracted = text.chars().count();
    Ok(ExtractReport {
        text: text.trim().to_string(),
        file_name,
        characters_extracted,
    })
}

/// Copy the original PDF into the archive directory under a unique name
async fn archive_original(input: &Path, dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create archive directory '{dir:?}'"))?;
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chapter.pdf".to_string());
    let archived = dir.join(format!("{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::copy(input, &archived)
        .await
        .with_context(|| format!("failed to copy original PDF to '{archived:?}'"))?;
    info!("Archived original PDF to {archived:?}");
    Ok(())
}

/// Turn the chapter input into plain text ready for prompting.
/// PDFs run through the built-in extractor and must clear the minimum gate;
/// plain text passes through as-is.
async fn resolve_chapter_text(
    input: &Path,
    forced_kind: Option<SourceKind>,
    no_progress: bool,
) -> anyhow::Result<String> {
    let kind = match forced_kind {
        Some(kind) => {
            debug!("Using forced chapter kind: {kind:?}");
            kind
        }
        None => {
            let maybe_file_ext = file_type::file_extension_lowercase(input);
            let mut detected = file_type::match_kind_by_extension(&maybe_file_ext);
            debug!("Detected chapter kind by extension '{maybe_file_ext:?}': {detected:?}");
            if detected == extractor::Kind::Unsupported {
                let maybe_mime = Some(file_type::mime_type(&input.to_path_buf())?);
                detected = file_type::match_kind_by_mime(&maybe_mime);
                debug!("Detected chapter kind by mime '{maybe_mime:?}': {detected:?}");
            }
            match detected {
                extractor::Kind::PlainText => SourceKind::Text,
                extractor::Kind::PdfNative => SourceKind::Pdf,
                extractor::Kind::Unsupported => {
                    return Err(anyhow::anyhow!(
                        concat!(
                            "unsupported chapter input '{:?}'. ",
                            "Kind detection is heuristic and may be wrong. ",
                            "Try specifying one explicitly via --chapter-kind."
                        ),
                        input,
                    ));
                }
            }
        }
    };
    info!("Treating chapter input as {kind:?}");

    let bytes = match kind {
        SourceKind::Text => {
            let text = tokio::fs::read_to_string(input)
                .await
                .with_context(|| format!("failed to read chapter text from '{input:?}'"))?;
            if text.trim().is_empty() {
                return Err(anyhow::anyhow!("chapter text file '{input:?}' is empty"));
            }
            return Ok(text.trim().to_string());
        }
        SourceKind::Pdf => tokio::fs::read(input)
            .await
            .with_context(|| format!("failed to read PDF file '{input:?}'"))?,
        SourceKind::PdfBase64 => {
            let payload = tokio::fs::read_to_string(input)
                .await
                .with_context(|| format!("failed to read base64 PDF payload from '{input:?}'"))?;
            chapter::decode_base64_pdf(&payload)?
        }
    };
    chapter::ensure_pdf_size(bytes.len())?;

    let bar = create_spinner(EXTRACT_SPINNER_TEMPLATE.as_str(), no_progress)?;
    bar.set_message("Extracting text from PDF...");
    let text = extractor::pdf::extract_text(&bytes);
    match chapter::ensure_readable(&text) {
        Ok(()) => {
            bar.finish_with_message("Extraction completed.");
            Ok(text.trim().to_string())
        }
        Err(err) => {
            bar.finish_and_clear();
            Err(err)
        }
    }
}

/// Prompt the LLM for a study pack, with a dedicated second pass when the
/// important questions come back empty.
async fn generate_pack(
    chapter_text: &str,
    args: &GenerateArgs,
    no_progress: bool,
) -> anyhow::Result<StudyPack> {
    let meta = PackMeta {
        subject: args
            .meta_args
            .subject
            .clone()
            .expect("subject is required"),
        grade: args.meta_args.grade.clone().expect("grade is required"),
        chapter_title: args
            .meta_args
            .chapter_title
            .clone()
            .expect("chapter title is required"),
        language: args.meta_args.language.clone(),
    };

    // Log LLM request info
    let model = &args.llm_request_opts.model;
    let provider_label = match &args.llm_construction_opts.provider {
        Some(provider) => provider.as_str().to_string(),
        None => llm::infer_adapter_kind(model)?.as_lower_str().to_string(),
    };
    info!("LLM request: model='{model}', provider='{provider_label}'");

    let bar = create_spinner(GENERATE_SPINNER_TEMPLATE.as_str(), no_progress)?;

    bar.set_message("Generating chat messages for the study pack...");
    let system_vars: SystemPromptVariables = message::guidelines_for_grade(&meta.grade).into();
    let user_vars = UserPromptVariables {
        grade: meta.grade.clone(),
        subject: meta.subject.clone(),
        chapter_title: meta.chapter_title.clone(),
        language: meta.language.clone(),
        chapter_text: chapter::truncate_chars(chapter_text, chapter::CHAPTER_CHAR_BUDGET)
            .to_string(),
    };
    let chat_messages =
        message::create_chat_messages(&args.chat_message_opts, &system_vars, &user_vars)?;

    bar.set_message("Generating study pack with LLM...");
    let llm_client = llm::create_llm_client(&args.llm_construction_opts)?;
    let response = match llm::chat_request(
        &llm_client,
        &args.llm_request_opts,
        &llm::PACK_CHAT_SETTINGS,
        chat_messages,
    )
    .await
    {
        Ok(response) => response,
        Err(err) => {
            bar.finish_and_clear();
            return Err(err);
        }
    };

    let generated = match pack::parse_generated_pack(&response) {
        Ok(generated) => generated,
        Err(err) => {
            bar.finish_and_clear();
            return Err(err);
        }
    };
    let mut important_questions = pack::normalize_important_questions(&generated.important_questions);

    // The model tends to omit important questions when the chapter is short;
    // recover them with a dedicated request instead of failing the pack.
    if important_questions.is_empty() {
        info!("Important questions missing from main response; generating separately");
        bar.set_message("Generating important questions with LLM...");
        important_questions = generate_important_questions(&llm_client, args, &meta, chapter_text)
            .await
            .unwrap_or_else(|err| {
                warn!("failed to generate important questions separately: {err:#}");
                ImportantQuestions::default()
            });
    }

    bar.finish_with_message("Study pack generation completed.");
    Ok(StudyPack::assemble(meta, generated, important_questions))
}

/// Dedicated fallback request for the important-questions section
async fn generate_important_questions(
    client: &genai::Client,
    args: &GenerateArgs,
    meta: &PackMeta,
    chapter_text: &str,
) -> anyhow::Result<ImportantQuestions> {
    let user_vars = UserPromptVariables {
        grade: meta.grade.clone(),
        subject: meta.subject.clone(),
        chapter_title: meta.chapter_title.clone(),
        language: meta.language.clone(),
        chapter_text: chapter::truncate_chars(chapter_text, chapter::QUESTIONS_CHAR_BUDGET)
            .to_string(),
    };
    let messages = message::create_questions_messages(&user_vars)?;
    let response = llm::chat_request(
        client,
        &args.llm_request_opts,
        &llm::QUESTIONS_CHAT_SETTINGS,
        messages,
    )
    .await?;
    pack::parse_important_questions(&response)
}
