// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

mod context_arg;

use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{anyhow, bail, Context, Error};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use context_arg::{parse_context_arg, ContextArg};
use workflow_parser::{
    templates::{
        context::{DEFAULT_MAX_ERRORS, DEFAULT_MAX_MESSAGE_LENGTH},
        evaluate_template, TemplateContext, TemplateSchema,
    },
    workflow::{load_workflow, load_workflow_schema, parse_workflow, JobKind, WORKFLOW_ROOT},
    yaml_utils::{token_to_yaml, yaml_emit_to_string, yaml_load_from_file, yaml_to_data},
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command {
    let file_arg = Arg::new("file")
        .value_name("FILE")
        .help("Workflow file to read")
        .required(true)
        .value_parser(value_parser!(PathBuf));

    Command::new("workflow-parser")
        .about("Reads, validates and expands CI workflow files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Validate a workflow and list its jobs")
                .arg(file_arg.clone())
                .arg(
                    Arg::new("max-errors")
                        .long("max-errors")
                        .value_name("N")
                        .help("Stop collecting diagnostics after N errors (0 for no limit)")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("expand")
                .about("Evaluate a workflow's expressions and print the result as YAML")
                .arg(file_arg)
                .arg(
                    Arg::new("context")
                        .long("context")
                        .value_name("NAME=FILE")
                        .help("Make the YAML in FILE available to expressions as NAME")
                        .action(ArgAction::Append)
                        .value_parser(parse_context_arg),
                ),
        )
}

fn run() -> Result<ExitCode, Error> {
    let matches = cli().get_matches();
    let schema = Arc::new(load_workflow_schema()?);

    match matches.subcommand() {
        Some(("check", args)) => check(schema, args),
        Some(("expand", args)) => expand(schema, args),
        Some((name, _)) => bail!("Unknown command '{}'", name),
        None => bail!("No command given"),
    }
}

fn read_file(args: &ArgMatches) -> Result<(String, String), Error> {
    let file = args
        .get_one::<PathBuf>("file")
        .ok_or_else(|| anyhow!("No workflow file given"))?;
    let content = fs::read_to_string(file).with_context(|| format!("Failed to read '{}'", file.display()))?;
    Ok((file.display().to_string(), content))
}

fn check(schema: Arc<TemplateSchema>, args: &ArgMatches) -> Result<ExitCode, Error> {
    let (file_name, content) = read_file(args)?;
    let max_errors = args.get_one::<usize>("max-errors").copied().unwrap_or(DEFAULT_MAX_ERRORS);

    let mut context = TemplateContext::with_limits(schema, max_errors, DEFAULT_MAX_MESSAGE_LENGTH);
    let workflow = load_workflow(&mut context, &file_name, &content);

    for error in &workflow.errors {
        println!("{}", error);
    }

    for job in &workflow.jobs {
        let needs: Vec<&str> = job.need_ids().collect();
        let kind = match &job.kind {
            JobKind::Steps(steps_job) => format!("{} steps", steps_job.steps.len()),
            JobKind::Reusable(reusable) => format!("uses {}", reusable.uses),
        };
        println!("job {}: {} (needs: [{}], if: {})", job.id, kind, needs.join(", "), job.condition);
    }

    debug!(errors = workflow.errors.len(), jobs = workflow.jobs.len(), "checked workflow");
    match workflow.errors.is_empty() {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::from(1)),
    }
}

fn expand(schema: Arc<TemplateSchema>, args: &ArgMatches) -> Result<ExitCode, Error> {
    let (file_name, content) = read_file(args)?;
    let mut context = TemplateContext::new(schema);

    for arg in args.get_many::<ContextArg>("context").into_iter().flatten() {
        let yaml = yaml_load_from_file(&arg.path)?;
        let data = yaml_to_data(&yaml).with_context(|| format!("Invalid context '{}'", arg.name))?;
        context.add_context(arg.name.clone(), data);
    }

    let template = parse_workflow(&mut context, &file_name, &content);
    let expanded = match template {
        Some(template) if context.errors.is_empty() => {
            let file_id = context.get_file_id(&file_name);
            evaluate_template(&mut context, WORKFLOW_ROOT, &template, Some(file_id))
        }
        _ => None,
    };

    for error in &context.errors {
        eprintln!("{}", error);
    }

    match expanded {
        Some(expanded) => {
            println!("{}", yaml_emit_to_string(&token_to_yaml(&expanded))?);
            match context.errors.is_empty() {
                true => Ok(ExitCode::SUCCESS),
                false => Ok(ExitCode::from(1)),
            }
        }
        None => Ok(ExitCode::from(1)),
    }
}
