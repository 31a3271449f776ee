//! Server-side tools offered on the Convert, OCR and AI tabs

use crate::state::Tab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolFeature {
    ConvertToWord,
    ConvertToExcel,
    ExtractText,
    AiSummarize,
    AiTranslate,
}

impl ToolFeature {
    pub fn tab(&self) -> Tab {
        match self {
            ToolFeature::ConvertToWord | ToolFeature::ConvertToExcel => Tab::Convert,
            ToolFeature::ExtractText => Tab::Ocr,
            ToolFeature::AiSummarize | ToolFeature::AiTranslate => Tab::AiTools,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ToolFeature::ConvertToWord | ToolFeature::ConvertToExcel => "/api/convert",
            ToolFeature::ExtractText => "/api/ocr",
            ToolFeature::AiSummarize => "/api/ai/summarize",
            ToolFeature::AiTranslate => "/api/ai/translate",
        }
    }

    pub fn form_fields(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            ToolFeature::ConvertToWord => vec![("to", "word")],
            ToolFeature::ConvertToExcel => vec![("to", "excel")],
            ToolFeature::ExtractText => vec![("searchable", "true")],
            ToolFeature::AiSummarize => vec![("tool", "summarize")],
            ToolFeature::AiTranslate => vec![("tool", "translate")],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ToolFeature::ConvertToWord => "Convert to Word",
            ToolFeature::ConvertToExcel => "Convert to Excel",
            ToolFeature::ExtractText => "OCR",
            ToolFeature::AiSummarize => "AI Summarize",
            ToolFeature::AiTranslate => "AI Translate",
        }
    }

    /// Download name and MIME type for the tool's output
    pub fn output_for(&self, source_name: &str) -> (String, &'static str) {
        let stem = source_name
            .strip_suffix(".pdf")
            .or_else(|| source_name.strip_suffix(".PDF"))
            .unwrap_or(source_name);
        match self {
            ToolFeature::ConvertToWord => (
                format!("{}.docx", stem),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            ToolFeature::ConvertToExcel => (
                format!("{}.xlsx", stem),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ToolFeature::ExtractText => (format!("{}_ocr.pdf", stem), crate::intake::PDF_MIME),
            ToolFeature::AiSummarize => (format!("{}_summary.txt", stem), "text/plain"),
            ToolFeature::AiTranslate => (format!("{}_translated.pdf", stem), crate::intake::PDF_MIME),
        }
    }

    /// Parse the `data-tool` / select value used by the page
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "word" | "convert-word" => Some(ToolFeature::ConvertToWord),
            "excel" | "convert-excel" => Some(ToolFeature::ConvertToExcel),
            "ocr" => Some(ToolFeature::ExtractText),
            "summarize" | "ai-summarize" => Some(ToolFeature::AiSummarize),
            "translate" | "ai-translate" => Some(ToolFeature::AiTranslate),
            _ => None,
        }
    }
}
