//! Post-processing applied to every validated deck before it leaves the
//! engine: id stamping, placeholder image injection, trailing-empty trimming
//! and `totalSlides` recomputation, in that order.
//!
//! Running the processor over its own output changes only block ids.

use tracing::debug;
use uuid::Uuid;

use crate::model::{Block, BlockContent, BlockKind, Deck, ImageLayout, ImagePayload, ImageSize, Slide};
use crate::registry::BlockRegistry;

/// Issues `${kind}_${monotonic}_${random}` ids for one deck.
struct IdSequence {
    next: u64,
}

impl IdSequence {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn issue(&mut self, kind: BlockKind) -> String {
        let seq = self.next;
        self.next += 1;
        let random = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}", kind.tag(), seq, &random[..8])
    }
}

pub struct PostProcessor<'a> {
    registry: &'a BlockRegistry,
}

impl<'a> PostProcessor<'a> {
    pub fn new(registry: &'a BlockRegistry) -> Self {
        Self { registry }
    }

    pub fn process(&self, mut deck: Deck) -> Deck {
        let mut ids = IdSequence::new();

        for slide in &mut deck.slides {
            for block in &mut slide.blocks {
                block.id = ids.issue(block.kind());
            }
        }

        for (index, slide) in deck.slides.iter_mut().enumerate() {
            if let Some(mut block) = placeholder_for(slide, index) {
                block.id = ids.issue(BlockKind::Image);
                slide.blocks.insert(0, block);
            }
        }

        for slide in &mut deck.slides {
            let before = slide.blocks.len();
            while slide.blocks.last().is_some_and(|b| b.content.is_empty()) {
                slide.blocks.pop();
            }
            if slide.blocks.is_empty() {
                let mut filler = Block::new(self.registry.default_payload(BlockKind::Text));
                filler.id = ids.issue(BlockKind::Text);
                slide.blocks.push(filler);
            }
            if slide.blocks.len() != before {
                debug!(
                    slide = %slide.title,
                    before,
                    after = slide.blocks.len(),
                    "[SCGE][POST] Trimmed trailing empty blocks"
                );
            }
        }

        deck.total_slides = deck.slides.len();
        deck
    }
}

/// Alternating float: even slide indices float right, odd ones float left.
pub fn placeholder_layout(slide_index: usize) -> ImageLayout {
    if slide_index % 2 == 0 {
        ImageLayout::FloatRight
    } else {
        ImageLayout::FloatLeft
    }
}

fn placeholder_for(slide: &Slide, index: usize) -> Option<Block> {
    let keywords = slide.suggested_images.as_ref()?;
    if keywords.iter().all(|k| k.trim().is_empty()) {
        return None;
    }

    let already_injected = matches!(
        slide.blocks.first().map(|b| &b.content),
        Some(BlockContent::Image(image))
            if image.is_placeholder() && image.suggested_keywords.as_ref() == Some(keywords)
    );
    if already_injected {
        return None;
    }

    Some(Block::new(BlockContent::Image(ImagePayload {
        uri: None,
        caption: String::new(),
        layout: placeholder_layout(index),
        size: ImageSize::Small,
        placeholder: Some(true),
        suggested_keywords: Some(keywords.clone()),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DividerPayload, ParagraphPayload, TextPayload};
    use std::collections::HashSet;

    fn text(points: &[&str]) -> Block {
        Block {
            id: "llm-supplied".into(),
            content: BlockContent::Text(TextPayload {
                points: points.iter().map(|p| p.to_string()).collect(),
            }),
        }
    }

    fn slide(title: &str, blocks: Vec<Block>, images: Option<Vec<&str>>) -> Slide {
        Slide {
            title: title.into(),
            subtitle: String::new(),
            blocks,
            suggested_images: images.map(|v| v.into_iter().map(String::from).collect()),
        }
    }

    fn deck(slides: Vec<Slide>) -> Deck {
        Deck {
            title: "Deck".into(),
            total_slides: 99,
            slides,
        }
    }

    fn strip_ids(mut deck: Deck) -> Deck {
        for slide in &mut deck.slides {
            for block in &mut slide.blocks {
                block.id.clear();
            }
        }
        deck
    }

    #[test]
    fn stamps_fresh_unique_ids() {
        let registry = BlockRegistry::standard();
        let out = PostProcessor::new(&registry).process(deck(vec![slide(
            "A",
            vec![text(&["one"]), text(&["two"])],
            None,
        )]));
        let ids: HashSet<_> = out.slides[0].blocks.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        for id in &ids {
            assert!(id.starts_with("text_"), "unexpected id {id}");
            assert_ne!(id, "llm-supplied");
        }
    }

    #[test]
    fn injects_placeholders_with_alternating_layout() {
        let registry = BlockRegistry::standard();
        let out = PostProcessor::new(&registry).process(deck(vec![
            slide("A", vec![text(&["a"])], Some(vec!["supreme court"])),
            slide("B", vec![text(&["b"])], Some(vec!["parliament"])),
            slide("C", vec![text(&["c"])], Some(vec![])),
        ]));

        let first = &out.slides[0].blocks[0];
        match &first.content {
            BlockContent::Image(image) => {
                assert!(image.is_placeholder());
                assert_eq!(image.layout, ImageLayout::FloatRight);
                assert_eq!(image.size, ImageSize::Small);
                assert_eq!(image.suggested_keywords, Some(vec!["supreme court".to_string()]));
            }
            other => panic!("expected image placeholder, got {other:?}"),
        }
        assert!(matches!(
            &out.slides[1].blocks[0].content,
            BlockContent::Image(image) if image.layout == ImageLayout::FloatLeft
        ));
        assert_eq!(out.slides[2].blocks.len(), 1);
        assert_eq!(out.total_slides, 3);
    }

    #[test]
    fn trims_trailing_empties_but_keeps_inner_ones() {
        let registry = BlockRegistry::standard();
        let empty_para = Block::new(BlockContent::Paragraph(ParagraphPayload::default()));
        let divider = Block::new(BlockContent::Divider(DividerPayload::default()));
        let out = PostProcessor::new(&registry).process(deck(vec![slide(
            "A",
            vec![text(&[""]), divider, text(&["kept"]), empty_para.clone(), text(&[" "])],
            None,
        )]));
        let kinds: Vec<_> = out.slides[0].blocks.iter().map(|b| b.kind()).collect();
        assert_eq!(kinds, vec![BlockKind::Text, BlockKind::Divider, BlockKind::Text]);
    }

    #[test]
    fn emptied_slide_gets_default_text_block() {
        let registry = BlockRegistry::standard();
        let out = PostProcessor::new(&registry).process(deck(vec![
            slide("A", vec![text(&[""])], None),
            slide("B", vec![], None),
        ]));
        for slide in &out.slides {
            assert_eq!(slide.blocks.len(), 1);
            assert_eq!(
                slide.blocks[0].content,
                BlockContent::Text(TextPayload {
                    points: vec![String::new()]
                })
            );
            assert!(!slide.blocks[0].id.is_empty());
        }
    }

    #[test]
    fn is_idempotent_up_to_ids() {
        let registry = BlockRegistry::standard();
        let processor = PostProcessor::new(&registry);
        let once = processor.process(deck(vec![
            slide("A", vec![text(&["a"]), text(&[""])], Some(vec!["court", "court"])),
            slide("B", vec![], Some(vec!["gavel"])),
            slide("C", vec![text(&["c"])], None),
        ]));
        let twice = processor.process(once.clone());
        assert_eq!(strip_ids(twice), strip_ids(once));
    }

    #[test]
    fn duplicate_keywords_across_slides_are_preserved() {
        let registry = BlockRegistry::standard();
        let out = PostProcessor::new(&registry).process(deck(vec![
            slide("A", vec![text(&["a"])], Some(vec!["court"])),
            slide("B", vec![text(&["b"])], Some(vec!["court"])),
        ]));
        for slide in &out.slides {
            assert!(matches!(
                &slide.blocks[0].content,
                BlockContent::Image(image) if image.suggested_keywords == Some(vec!["court".to_string()])
            ));
        }
    }
}
