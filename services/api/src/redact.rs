use clap::Args;
use rent_management::error::AppError;
use rent_management::shape::{filter, filter_strict, Template};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct RedactArgs {
    /// JSON document to redact
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Shape template in JSON notation (`true` leaves, nested objects, one-element arrays)
    #[arg(long)]
    pub(crate) template: PathBuf,
    /// Fail when the template and the document disagree on shape
    #[arg(long)]
    pub(crate) strict: bool,
}

pub(crate) fn run_redact(args: RedactArgs) -> Result<(), AppError> {
    let document = read_json(&args.input)?;
    let template = Template::from_json(&read_json(&args.template)?)?;
    let redacted = redact(&document, &template, args.strict)?;
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

fn redact(document: &Value, template: &Template, strict: bool) -> Result<Value, AppError> {
    if strict {
        Ok(filter_strict(document, template)?)
    } else {
        Ok(filter(document, template))
    }
}

fn read_json(path: &Path) -> Result<Value, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
