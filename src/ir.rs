use crate::reshape::{TidyTable, GROUP, LABEL, SERIES, VALUE};

// =============================================================================
// Chart Spec: backend-independent description of what to draw
// =============================================================================

/// A renderable chart: one mark, its encodings, an optional title, and data.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub mark: Mark,
    pub encoding: Encoding,
    pub title: Option<TitleBlock>,
    pub data: ChartData,
}

impl ChartSpec {
    pub fn x_title(&self) -> Option<&str> {
        self.encoding.x.as_ref().and_then(|c| c.title.as_deref())
    }

    pub fn y_title(&self) -> Option<&str> {
        self.encoding.y.as_ref().and_then(|c| c.title.as_deref())
    }

    pub fn color_field(&self) -> Option<Field> {
        self.encoding.color.as_ref().map(|c| c.field)
    }

    pub fn is_stacked(&self) -> bool {
        self.encoding
            .y
            .as_ref()
            .is_some_and(|c| c.stack == Some(Stack::Zero))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.data, ChartData::Notice(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Bar,
    Arc,
    Line { point: bool },
    Circle { size: f64 },
    Text,
}

impl Mark {
    pub fn name(&self) -> &'static str {
        match self {
            Mark::Bar => "bar",
            Mark::Arc => "arc",
            Mark::Line { .. } => "line",
            Mark::Circle { .. } => "circle",
            Mark::Text => "text",
        }
    }
}

/// Columns of the tidy table (plus the placeholder message column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Label,
    Value,
    Series,
    Group,
    Message,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Label => LABEL,
            Field::Value => VALUE,
            Field::Series => SERIES,
            Field::Group => GROUP,
            Field::Message => "msg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Nominal,
    Quantitative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stack {
    Zero,
}

/// A single encoding channel: which field, how to read it, how to title it
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub field: Field,
    pub field_type: FieldType,
    pub title: Option<String>,
    pub stack: Option<Stack>,
}

impl Channel {
    pub fn nominal(field: Field) -> Self {
        Self {
            field,
            field_type: FieldType::Nominal,
            title: None,
            stack: None,
        }
    }

    pub fn quantitative(field: Field) -> Self {
        Self {
            field,
            field_type: FieldType::Quantitative,
            title: None,
            stack: None,
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn stacked(mut self, stack: Stack) -> Self {
        self.stack = Some(stack);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Encoding {
    pub x: Option<Channel>,
    pub y: Option<Channel>,
    pub color: Option<Channel>,
    pub theta: Option<Channel>,
    pub text: Option<Channel>,
    pub tooltip: Vec<Channel>,
}

/// Title text with an optional subtitle
#[derive(Debug, Clone, PartialEq)]
pub struct TitleBlock {
    pub text: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Tidy(TidyTable),
    /// Single-row message table for the unsupported-kind placeholder
    Notice(String),
}
