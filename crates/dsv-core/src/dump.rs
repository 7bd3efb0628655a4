//! Human- and machine-readable renderings of a decoded [`Document`].
use std::fmt::Write as _;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::block::Block;
use crate::document::Document;
use crate::error::Result;
use crate::record::{DEFAULT_BLOB_PREVIEW, Record, RecordValue, fourcc, hex_upper};
use crate::scan::find_store_files;

#[derive(Debug, Clone, Copy)]
pub struct DumpOpts {
    /// Tree levels to include, counting the root; deeper nodes are omitted.
    pub max_depth: usize,
    /// Blobs longer than this are summarized when `blob_summary` is set.
    pub max_blob_bytes: usize,
    pub blob_summary: bool,
}

impl Default for DumpOpts {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_blob_bytes: DEFAULT_BLOB_PREVIEW,
            blob_summary: true,
        }
    }
}

impl DumpOpts {
    fn blob_limit(&self) -> usize {
        if self.blob_summary {
            self.max_blob_bytes
        } else {
            usize::MAX
        }
    }
}

pub fn dump_text(doc: &Document, opts: DumpOpts) -> String {
    let mut out = String::new();
    write_text(doc, &opts, &mut out).ok();
    out
}

fn write_text(doc: &Document, opts: &DumpOpts, out: &mut String) -> std::fmt::Result {
    let h = doc.header();
    writeln!(out, "Header:")?;
    writeln!(out, "{{")?;
    writeln!(out, "    - Alignment: {:#010X}", h.alignment)?;
    writeln!(out, "    - Magic:     {:#010X}", h.magic)?;
    writeln!(out, "    - Offset 1:  {:#010X}", h.root_offset)?;
    writeln!(out, "    - Size:      {:#010X}", h.root_size)?;
    writeln!(out, "    - Offset 2:  {:#010X}", h.root_offset_dup)?;
    writeln!(out, "}}")?;

    let a = doc.allocator();
    writeln!(out, "Allocator:")?;
    writeln!(out, "{{")?;
    writeln!(out, "    - Blocks:      {}", a.blocks().len())?;
    writeln!(out, "    - Directories: {}", a.directories().len())?;
    writeln!(
        out,
        "    - Free blocks: {}",
        a.free_list().iter().map(Vec::len).sum::<usize>()
    )?;
    writeln!(out, "}}")?;

    writeln!(out, "Directories:")?;
    writeln!(out, "{{")?;
    for (name, master) in doc.directories() {
        writeln!(
            out,
            "    {name}: levels {}, records {}, blocks {}",
            master.levels, master.record_count, master.block_count
        )?;
        write_node_text(&master.root_node, 0, opts, out)?;
    }
    writeln!(out, "}}")
}

fn write_node_text(
    node: &Block,
    depth: usize,
    opts: &DumpOpts,
    out: &mut String,
) -> std::fmt::Result {
    writeln!(out, "    {{")?;
    writeln!(out, "        - ID:       {}", node.id)?;
    writeln!(out, "        - Mode:     {:#06X}", node.mode)?;
    writeln!(out, "        - Children: {}", node.children.len())?;
    writeln!(out, "        - Records:  {}", node.records.len())?;
    if !node.records.is_empty() {
        writeln!(out, "        {{")?;
        for r in &node.records {
            writeln!(out, "            {{")?;
            writeln!(out, "                Name:      {}", r.name)?;
            writeln!(
                out,
                "                Type:      {:#010X} ({})",
                r.type_code,
                fourcc(r.type_code)
            )?;
            writeln!(out, "                Data Type: {}", r.data_type())?;
            writeln!(
                out,
                "                Value:     {}",
                r.value.display_with(opts.blob_limit())
            )?;
            writeln!(out, "            }}")?;
        }
        writeln!(out, "        }}")?;
    }
    writeln!(out, "    }}")?;
    if depth + 1 < opts.max_depth {
        for child in &node.children {
            write_node_text(child, depth + 1, opts, out)?;
        }
    } else if !node.children.is_empty() {
        writeln!(out, "    ({} children omitted)", node.children.len())?;
    }
    Ok(())
}

pub fn dump_json(doc: &Document, opts: DumpOpts) -> Value {
    let h = doc.header();
    let a = doc.allocator();
    let mut dirs = Map::new();
    for (name, master) in doc.directories() {
        dirs.insert(
            name.clone(),
            json!({
                "id": master.id,
                "rootNodeId": master.root_node_id,
                "levels": master.levels,
                "recordCount": master.record_count,
                "blockCount": master.block_count,
                "root": node_json(&master.root_node, 0, &opts),
            }),
        );
    }
    json!({
        "header": {
            "alignment": h.alignment,
            "magic": h.magic,
            "rootOffset": h.root_offset,
            "rootSize": h.root_size,
            "rootOffsetDup": h.root_offset_dup,
        },
        "allocator": {
            "blocks": a.blocks().len(),
            "directories": a
                .directories()
                .iter()
                .map(|d| json!({ "name": d.name, "id": d.id }))
                .collect::<Vec<_>>(),
            "free": a.free_list().iter().map(Vec::len).sum::<usize>(),
        },
        "directories": dirs,
    })
}

fn node_json(node: &Block, depth: usize, opts: &DumpOpts) -> Value {
    let children = if depth + 1 < opts.max_depth {
        Value::Array(
            node.children
                .iter()
                .map(|c| node_json(c, depth + 1, opts))
                .collect(),
        )
    } else {
        json!({ "$truncated": true, "$omitted": node.children.len() })
    };
    json!({
        "id": node.id,
        "mode": node.mode,
        "records": node.records.iter().map(|r| record_json(r, opts)).collect::<Vec<_>>(),
        "children": children,
    })
}

pub fn record_json(r: &Record, opts: &DumpOpts) -> Value {
    json!({
        "name": r.name,
        "type": fourcc(r.type_code),
        "typeCode": r.type_code,
        "dataType": r.data_type().as_tag(),
        "value": value_json(&r.value, opts),
    })
}

fn value_json(v: &RecordValue, opts: &DumpOpts) -> Value {
    match v {
        RecordValue::Bool(b) => json!(b),
        RecordValue::Long(x) | RecordValue::Shor(x) => json!(x),
        RecordValue::Comp(x) => json!(x),
        RecordValue::Type(code) => json!(fourcc(*code)),
        RecordValue::Dutc(_) | RecordValue::Ustr(_) => json!(v.to_string()),
        RecordValue::Blob(b) if b.len() > opts.blob_limit() => {
            json!({ "$type": "blob", "len": b.len() })
        }
        RecordValue::Blob(b) => json!(hex_upper(b)),
    }
}

pub fn dump_file_text(path: &Path, opts: DumpOpts) -> Result<String> {
    Ok(dump_text(&Document::open(path)?, opts))
}

pub fn dump_file_json(path: &Path, opts: DumpOpts) -> Result<Value> {
    Ok(dump_json(&Document::open(path)?, opts))
}

/// One entry per store file under `dir`, keyed by path. Files that fail to
/// decode are reported inline as `{"$error": ...}`.
pub fn dump_dir_json(dir: &Path, max_walk_depth: Option<usize>, opts: DumpOpts) -> Value {
    let mut out = Map::new();
    for f in find_store_files(dir, max_walk_depth) {
        let entry = match dump_file_json(&f, opts) {
            Ok(v) => v,
            Err(e) => json!({ "$error": e.to_string() }),
        };
        out.insert(f.display().to_string(), entry);
    }
    Value::Object(out)
}

pub fn dump_dir_text(dir: &Path, max_walk_depth: Option<usize>, opts: DumpOpts) -> String {
    let mut out = String::new();
    for f in find_store_files(dir, max_walk_depth) {
        writeln!(&mut out, "==> {} <==", f.display()).ok();
        match dump_file_text(&f, opts) {
            Ok(s) => out.push_str(&s),
            Err(e) => {
                writeln!(&mut out, "error: {}", e).ok();
            }
        }
    }
    out
}
