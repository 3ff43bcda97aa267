use xtract::block::Block;
use xtract::block::position::Position;
use xtract::document::{Matcher, Node, Record, RecordError, children_named, explore_nodes, parse_record};
use xtract::operation::Level;

use crate::environment::{Context, Environment};
use crate::evaluator::conditions_hold;
use crate::extract::{emit_raw, process_commands};
use crate::values::Site;

struct Walk<'a> {
    record: &'a Record,
    ctx: &'a Context,
    env: Environment,
    out: String,
}

/// Nodes a block visits under `node`, with their nesting levels.
fn candidates<'n>(block: &Block, node: &'n Node, level: usize) -> Vec<(&'n Node, usize)> {
    let (name, wildcard) = match block.matcher.strip_prefix(':') {
        Some(name) => (name, true),
        None => (block.matcher.as_str(), false),
    };
    let matcher = Matcher::new(block.parent.as_deref(), name).wildcard(wildcard);
    let mut found = Vec::new();
    explore_nodes(node, &matcher, level, &mut |child, _, child_level| {
        found.push((child, child_level));
    });

    // each path component is an immediate child of the previous one
    for component in &block.path {
        found = found
            .into_iter()
            .flat_map(|(parent, parent_level)| {
                children_named(parent, component, false)
                    .into_iter()
                    .map(move |child| (child, parent_level + 1))
            })
            .collect();
    }
    found
}

impl<'a> Walk<'a> {
    fn block(&mut self, block: &Block, node: &'a Node, level: usize) {
        self.out.push_str(&block.foreword);

        if block.level == Level::Root {
            for child in &block.children {
                self.block(child, node, level);
            }
        } else {
            let found: Vec<_> = candidates(block, node, level).into_iter().enumerate().collect();
            for (index, (child, child_level)) in block.position.select(found) {
                self.node(block, child, index + 1, child_level);
            }
        }

        self.out.push_str(&block.afterword);
    }

    fn node(&mut self, block: &Block, node: &'a Node, index: usize, level: usize) {
        let site = Site::new(self.record, node, index, level);

        if conditions_hold(&block.conditions, &site, &self.env.variables) {
            if block.position == Position::Select {
                emit_raw(self.record.text_of(node), &mut self.env, &mut self.out);
                return;
            }
            process_commands(&block.commands, &site, &mut self.env, self.ctx, &mut self.out);
            for child in &block.children {
                self.block(child, node, level);
            }
        } else if !block.failure.is_empty() {
            process_commands(&block.failure, &site, &mut self.env, self.ctx, &mut self.out);
        }
    }
}

/// Run a compiled query over one record.
///
/// Returns `header + body + trailer` followed by the record terminator, or
/// an empty string when the query produced nothing.
pub fn try_process_extract(
    record_text: &str,
    parent_tag: &str,
    index: usize,
    header: &str,
    trailer: &str,
    ctx: &Context,
    block: &Block,
) -> Result<String, RecordError> {
    let record = parse_record(record_text, parent_tag, ctx.policy)?;
    let mut walk = Walk {
        record: &record,
        ctx,
        env: Environment::new(),
        out: String::new(),
    };
    walk.block(block, &record.root, 1);

    let Walk { env, out: body, .. } = walk;
    tracing::debug!(record = index, bytes = body.len(), "processed record");
    if body.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}{}{}{}", header, body, trailer, env.ret))
}

/// Like [`try_process_extract`], but a malformed record is logged and
/// yields an empty string.
pub fn process_extract(
    record_text: &str,
    parent_tag: &str,
    index: usize,
    header: &str,
    trailer: &str,
    ctx: &Context,
    block: &Block,
) -> String {
    match try_process_extract(record_text, parent_tag, index, header, trailer, ctx, block) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(record = index, error = %err, "skipping malformed record");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtract::parser::parse_arguments;

    fn compile(args: &str) -> Block {
        let tokens: Vec<String> = args.split_whitespace().map(str::to_string).collect();
        parse_arguments(&tokens, "").unwrap()
    }

    #[test]
    fn path_visits_descend_through_immediate_children() {
        let block = compile("-pattern Rec -block Article.Authors.Name -element Last");
        let text = "<Rec><Article><Authors><Name><Last>A</Last></Name><Name><Last>B</Last></Name>\
            </Authors><Other><Name><Last>C</Last></Name></Other></Article></Rec>";
        assert_eq!(
            process_extract(text, "Rec", 1, "", "", &Context::new(), &block),
            "A\tB\n"
        );
    }

    #[test]
    fn malformed_records_are_skipped() {
        let block = compile("-pattern Rec -element Id");
        assert_eq!(process_extract("<Rec><Id>1</Rec>", "Rec", 1, "", "", &Context::new(), &block), "");
        assert!(try_process_extract("<Rec><Id>1</Rec>", "Rec", 1, "", "", &Context::new(), &block).is_err());
    }

    #[test]
    fn header_and_trailer_wrap_non_empty_output() {
        let block = compile("-pattern Rec -element Id");
        let ctx = Context::new();
        assert_eq!(process_extract("<Rec><Id>1</Id></Rec>", "Rec", 1, "H:", ":T", &ctx, &block), "H:1:T\n");
        assert_eq!(process_extract("<Rec><Other/></Rec>", "Rec", 1, "H:", ":T", &ctx, &block), "");
    }
}
