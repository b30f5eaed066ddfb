//! Add fillable form fields to existing pages.

use super::{page_stages, OpContext};
use crate::document::FieldKind;
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::layout::Rect;
use crate::pipeline::naming::derived_name;
use crate::pipeline::pages::{PageSelection, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One field to create.
///
/// ```json
/// { "name": "email", "type": "text", "page": 1,
///   "rect": { "x": 72, "y": 600, "width": 200, "height": 20 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    /// 1-based page number.
    pub page: u32,
    /// Field rectangle in page space, origin bottom-left.
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormFieldsOptions {
    pub fields: Vec<FormFieldSpec>,
}

impl FormFieldsOptions {
    /// Checks that need no document: at least one field, unique non-empty
    /// names, positive sizes.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        if self.fields.is_empty() {
            return Err(PdfOpsError::InvalidOptions("no form fields given".into()));
        }
        let mut names = HashSet::new();
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(PdfOpsError::InvalidOptions(format!(
                    "field {} has an empty name",
                    i + 1
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(PdfOpsError::InvalidOptions(format!(
                    "field name '{}' is used twice",
                    field.name
                )));
            }
            if field.rect.width <= 0.0 || field.rect.height <= 0.0 {
                return Err(PdfOpsError::InvalidOptions(format!(
                    "field '{}' needs a positive width and height",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

/// Field pages come from the field specs; the job's page selection is not
/// consulted.
pub(crate) async fn run(
    ctx: &OpContext<'_>,
    input: &InputFile,
    options: &FormFieldsOptions,
) -> Result<JobOutput, PdfOpsError> {
    options.validate()?;
    ctx.checkpoint()?;
    let mut doc = ctx.load(input)?;
    let total = doc.page_count();

    let field_pages = PageSelection::Pages(options.fields.iter().map(|f| f.page).collect());
    let touched = field_pages.resolve(total, SelectionPolicy::Extractive)?;

    let n = options.fields.len();
    let tracker = ctx.tracker(page_stages("fields", 10.0, 80.0, 10.0, n));
    tracker.complete_stage(0);
    ctx.job_started(n);

    for (done, field) in options.fields.iter().enumerate() {
        tracker.checkpoint()?;
        let page_num = field.page as usize;
        ctx.page_started(page_num, total);
        doc.add_form_field(page_num - 1, &field.name, &field.kind, field.rect)?;
        ctx.page_completed(page_num, total);
        tracker.advance(1, done + 1);
    }

    tracker.checkpoint()?;
    let bytes = doc.save()?;
    tracker.finish();

    let name = derived_name(&input.name, "with_fields", "pdf");
    Ok(ctx.output(
        vec![OutputFile::pdf(name, bytes, total)],
        touched.len(),
        Some(doc.metadata()),
    ))
}
