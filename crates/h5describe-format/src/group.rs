//! Group listing and path resolution for symbol-table (v1) and compact
//! link-message (v2) groups.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec::Vec};

use crate::btree_v1::collect_symbol_table_nodes;
use crate::bytes::{ensure_len, read_address};
use crate::error::FormatError;
use crate::link_message::{LinkMessage, LinkTarget};
use crate::local_heap::LocalHeap;
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::superblock::Superblock;
use crate::symbol_table::{SymbolTableMessage, SymbolTableNode};

/// Soft links followed in one lookup before giving up.
const MAX_SOFT_LINK_HOPS: usize = 32;

/// A named child of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub target: LinkTarget,
}

/// Outcome of resolving a path inside one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Object header address in this file.
    Object(u64),
    /// The path crosses an external link; continue at `path` in `file`.
    External { file: String, path: String },
}

/// List the links of the group whose object header is at `address`,
/// sorted by name.
pub fn list_links(data: &[u8], sb: &Superblock, address: u64) -> Result<Vec<Link>, FormatError> {
    let header = ObjectHeader::parse(data, address as usize, sb.offset_size, sb.length_size)?;
    let mut links = if let Some(msg) = header.find(MessageType::SymbolTable) {
        let table = SymbolTableMessage::parse(&msg.data, sb.offset_size)?;
        symbol_table_links(data, sb, &table)?
    } else {
        if let Some(info) = header.find(MessageType::LinkInfo) {
            if has_dense_storage(&info.data, sb.offset_size)? {
                return Err(FormatError::DenseLinkStorage);
            }
        }
        header
            .find_all(MessageType::Link)
            .map(|m| {
                LinkMessage::parse(&m.data, sb.offset_size).map(|l| Link {
                    name: l.name,
                    target: l.target,
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    };
    links.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(links)
}

/// True when the object header at `address` describes a group.
pub fn is_group(data: &[u8], sb: &Superblock, address: u64) -> Result<bool, FormatError> {
    let header = ObjectHeader::parse(data, address as usize, sb.offset_size, sb.length_size)?;
    Ok(header.find(MessageType::SymbolTable).is_some()
        || header.find(MessageType::LinkInfo).is_some()
        || (header.find(MessageType::Link).is_some()
            && header.find(MessageType::DataLayout).is_none()))
}

fn symbol_table_links(
    data: &[u8],
    sb: &Superblock,
    table: &SymbolTableMessage,
) -> Result<Vec<Link>, FormatError> {
    let heap = LocalHeap::parse(
        data,
        table.local_heap_address as usize,
        sb.offset_size,
        sb.length_size,
    )?;
    let snods =
        collect_symbol_table_nodes(data, table.btree_address, sb.offset_size, sb.length_size)?;
    let mut links = Vec::new();
    for snod in snods {
        for entry in SymbolTableNode::parse(data, snod as usize, sb.offset_size)?.entries {
            let name = heap.name(entry.link_name_offset)?;
            let target = match entry.soft_link_offset() {
                Some(off) => LinkTarget::Soft(heap.name(off)?),
                None => LinkTarget::Hard(entry.object_header_address),
            };
            links.push(Link { name, target });
        }
    }
    Ok(links)
}

/// Link info message: a defined fractal heap address means dense storage.
fn has_dense_storage(info: &[u8], offset_size: u8) -> Result<bool, FormatError> {
    ensure_len(info, 0, 2)?;
    let flags = info[1];
    let pos = if flags & 0x01 != 0 { 10 } else { 2 };
    Ok(read_address(info, pos, offset_size)?.is_some())
}

fn components(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

/// Resolve an absolute path from the root group.
///
/// Soft links are followed inside the file. The first external link stops
/// the walk and is returned with the remainder of the path appended to its
/// target path.
pub fn resolve(data: &[u8], sb: &Superblock, path: &str) -> Result<Resolved, FormatError> {
    // pending components, next one last
    let mut pending: Vec<String> = components(path).rev().map(String::from).collect();
    let mut current = sb.root_group_address;
    let mut current_path: Vec<String> = Vec::new();
    let mut hops = 0;

    while let Some(name) = pending.pop() {
        let links = list_links(data, sb, current)?;
        let link = links
            .into_iter()
            .find(|l| l.name == name)
            .ok_or_else(|| FormatError::PathNotFound(join(&current_path, &name)))?;

        match link.target {
            LinkTarget::Hard(address) => {
                current = address;
                current_path.push(name);
            }
            LinkTarget::Soft(target) => {
                hops += 1;
                if hops > MAX_SOFT_LINK_HOPS {
                    return Err(FormatError::PathNotFound(format!(
                        "{}: too many soft links",
                        join(&current_path, &name)
                    )));
                }
                if target.starts_with('/') {
                    current = sb.root_group_address;
                    current_path.clear();
                } else {
                    // relative targets resolve from the link's group again
                    current = resolve_hard(data, sb, &current_path)?;
                }
                pending.extend(components(&target).rev().map(String::from));
            }
            LinkTarget::External { file, path } => {
                let mut full = String::from(path.trim_end_matches('/'));
                for rest in pending.iter().rev() {
                    full.push('/');
                    full.push_str(rest);
                }
                if full.is_empty() {
                    full.push('/');
                }
                return Ok(Resolved::External { file, path: full });
            }
        }
    }
    Ok(Resolved::Object(current))
}

/// Re-walk a path made only of hard links.
fn resolve_hard(data: &[u8], sb: &Superblock, path: &[String]) -> Result<u64, FormatError> {
    let mut current = sb.root_group_address;
    for name in path {
        current = list_links(data, sb, current)?
            .into_iter()
            .find_map(|l| match l.target {
                LinkTarget::Hard(a) if &l.name == name => Some(a),
                _ => None,
            })
            .ok_or_else(|| FormatError::PathNotFound(name.clone()))?;
    }
    Ok(current)
}

fn join(parents: &[String], name: &str) -> String {
    let mut s = String::new();
    for p in parents {
        s.push('/');
        s.push_str(p);
    }
    s.push('/');
    s.push_str(name);
    s
}
