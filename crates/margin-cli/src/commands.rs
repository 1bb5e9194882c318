use anyhow::{Context, Result, bail};
use margin_engine::{
    Document, Node, Page, PageStorage, block_offsets, locate_flat, map_selection, slice_flat,
};
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Browse,
    List,
    New { title: String },
    Show { id: String },
    Delete { id: String },
    Share { id: String },
    Unshare { id: String },
    Shared { token: String },
    Select {
        id: String,
        block: usize,
        start: usize,
        end: usize,
    },
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let Some((name, rest)) = args.split_first() else {
            return Err("missing command".to_string());
        };
        let single = |what: &str| match rest {
            [value] => Ok(value.clone()),
            _ => Err(format!("{name} takes exactly one {what}")),
        };

        match name.as_str() {
            "browse" if rest.is_empty() => Ok(Command::Browse),
            "list" if rest.is_empty() => Ok(Command::List),
            "browse" | "list" => Err(format!("{name} takes no arguments")),
            "new" if !rest.is_empty() => Ok(Command::New {
                title: rest.join(" "),
            }),
            "new" => Err("new needs a title".to_string()),
            "show" => single("page id").map(|id| Command::Show { id }),
            "delete" => single("page id").map(|id| Command::Delete { id }),
            "share" => single("page id").map(|id| Command::Share { id }),
            "unshare" => single("page id").map(|id| Command::Unshare { id }),
            "shared" => single("share token").map(|token| Command::Shared { token }),
            "select" => match rest {
                [id, block, start, end] => Ok(Command::Select {
                    id: id.clone(),
                    block: parse_number("block", block)?,
                    start: parse_number("start", start)?,
                    end: parse_number("end", end)?,
                }),
                _ => Err("select takes <id> <block> <start> <end>".to_string()),
            },
            other => Err(format!("unknown command '{other}'")),
        }
    }

    /// Whether the command may run against a pages directory that does not exist yet
    pub fn creates_pages_dir(&self) -> bool {
        matches!(self, Command::New { .. })
    }
}

fn parse_number(what: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("{what} must be a non-negative number, got '{value}'"))
}

pub fn run(command: Command, storage: &mut dyn PageStorage, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Browse => bail!("browse needs a terminal"),
        Command::List => {
            for page in storage.list()? {
                writeln!(
                    out,
                    "{}  {}  {:<6}  {}",
                    page.id,
                    page.updated_at.format("%Y-%m-%d %H:%M"),
                    if page.is_public { "public" } else { "" },
                    page.title
                )?;
            }
        }
        Command::New { title } => {
            let page = storage.create(&title)?;
            writeln!(out, "{}", page.id)?;
        }
        Command::Show { id } => {
            let page = storage.get(&id)?;
            write_page(&page, out)?;
        }
        Command::Delete { id } => {
            storage.delete(&id)?;
            log::info!("Deleted page {id}");
        }
        Command::Share { id } => {
            let token = storage.set_public(&id)?;
            writeln!(out, "{token}")?;
        }
        Command::Unshare { id } => {
            storage.unset_public(&id)?;
            log::info!("Page {id} is private");
        }
        Command::Shared { token } => {
            let page = storage.get_by_share_token(&token)?;
            write_page(&page, out)?;
        }
        Command::Select {
            id,
            block,
            start,
            end,
        } => {
            let page = storage.get(&id)?;
            let document = Document::from_persisted(&page.content);
            select(&document, block, start, end, out)
                .with_context(|| format!("Failed to select in page {id}"))?;
        }
    }
    Ok(())
}

fn write_page(page: &Page, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "# {}", page.title)?;
    for line in block_lines(&Document::from_persisted(&page.content)) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// One line per top-level block: its flat start offset, type and text
pub fn block_lines(document: &Document) -> Vec<String> {
    document
        .nodes()
        .iter()
        .zip(block_offsets(document))
        .map(|(block, offset)| {
            let kind = match block {
                Node::Element(element) => element.kind.tag(),
                Node::Text(_) => "text",
            };
            format!("{offset:>5}  {kind:<13}  {}", block.plain_text())
        })
        .collect()
}

fn select(
    document: &Document,
    block: usize,
    start: usize,
    end: usize,
    out: &mut dyn Write,
) -> Result<()> {
    let offsets = block_offsets(document);
    let Some(&base) = offsets.get(block) else {
        bail!("block {block} out of range (page has {} blocks)", offsets.len());
    };
    let len = document.nodes()[block].text_len();

    let anchor = locate_flat(document, base + start.min(len));
    let focus = locate_flat(document, base + end.min(len));
    let (Some(anchor), Some(focus)) = (anchor, focus) else {
        bail!("block {block} has no selectable text");
    };

    let range = map_selection(document, &anchor, &focus);
    writeln!(out, "anchor {:?}@{}", anchor.path, anchor.offset)?;
    writeln!(out, "focus  {:?}@{}", focus.path, focus.offset)?;
    writeln!(out, "range  {}..{}", range.start, range.end)?;
    writeln!(out, "text   {:?}", slice_flat(document, range))?;
    Ok(())
}
