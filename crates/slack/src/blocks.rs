use serde::Serialize;

use shopbot_core::catalog::summary::{product_block, product_listing};
use shopbot_core::Product;

use crate::commands::{ProductQuery, USAGE_HINT};

/// Slack refuses messages carrying more blocks than this.
pub const MAX_MESSAGE_BLOCKS: usize = 50;
// Header, divider and the overflow note take the remaining three.
const MAX_PRODUCT_SECTIONS: usize = MAX_MESSAGE_BLOCKS - 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
    Divider { block_id: String },
}

/// Outgoing chat message: Block Kit layout plus the plain-text fallback Slack shows in
/// notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn product_results_message(query: &ProductQuery, products: &[Product]) -> MessageTemplate {
    if products.is_empty() {
        return empty_results_message(query);
    }

    let header = format!(
        "*{count} product(s)* priced {min}–{max}",
        count = products.len(),
        min = query.min_price,
        max = query.max_price
    );
    let mut builder = MessageBuilder::new(product_listing(products))
        .section("products.results.header.v1", |section| {
            section.mrkdwn(header);
        })
        .divider("products.results.divider.v1");

    for (index, product) in products.iter().take(MAX_PRODUCT_SECTIONS).enumerate() {
        builder = builder.section(format!("products.results.item.{index}.v1"), |section| {
            section.mrkdwn(product_block(product));
        });
    }

    let hidden = products.len().saturating_sub(MAX_PRODUCT_SECTIONS);
    if hidden > 0 {
        builder = builder.context("products.results.more.v1", |context| {
            context.plain(format!("…and {hidden} more product(s) not shown"));
        });
    }

    builder.build()
}

pub fn empty_results_message(query: &ProductQuery) -> MessageTemplate {
    let summary =
        format!("No products found priced between {} and {}.", query.min_price, query.max_price);
    MessageBuilder::new(summary.clone())
        .section("products.results.empty.v1", |section| {
            section.plain(summary);
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("products.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("products.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn usage_message() -> MessageTemplate {
    MessageBuilder::new(USAGE_HINT)
        .section("products.usage.v1", |section| {
            section.mrkdwn(format!(
                "*Product search*\n{USAGE_HINT}\nExample: `query - 100-200 - 5`"
            ));
        })
        .build()
}
