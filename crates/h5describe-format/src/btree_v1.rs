//! HDF5 B-tree version 1 traversal.
//!
//! Type 0 trees index the symbol table nodes of a group; type 1 trees index
//! the chunks of a chunked dataset.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_u16, read_u32, read_uint};
use crate::error::FormatError;

/// Node type of group B-trees.
pub const NODE_TYPE_GROUP: u8 = 0;
/// Node type of raw data chunk B-trees.
pub const NODE_TYPE_CHUNK: u8 = 1;

/// Deepest tree accepted before the file is treated as corrupt.
const MAX_DEPTH: usize = 64;

/// A parsed B-tree v1 node with its keys kept raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreeV1Node {
    pub node_type: u8,
    /// 0 for leaves.
    pub node_level: u8,
    /// `entries_used + 1` raw keys.
    pub keys: Vec<Vec<u8>>,
    /// Child addresses: subtrees for internal nodes, SNODs or chunks for leaves.
    pub children: Vec<u64>,
}

/// Location of one stored chunk, from a type 1 leaf key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Element offset of the chunk's first element in each dimension.
    pub offsets: Vec<u64>,
    /// Stored (filtered) size in bytes.
    pub size: u32,
    pub filter_mask: u32,
    pub address: u64,
}

impl BTreeV1Node {
    /// Parse a node whose keys are `key_size` bytes long.
    pub fn parse(
        file_data: &[u8],
        offset: usize,
        offset_size: u8,
        key_size: usize,
    ) -> Result<BTreeV1Node, FormatError> {
        let os = offset_size as usize;
        // signature(4) + type(1) + level(1) + entries(2) + two sibling addresses
        ensure_len(file_data, offset, 8 + 2 * os)?;
        if &file_data[offset..offset + 4] != b"TREE" {
            return Err(FormatError::InvalidBTreeSignature);
        }
        let node_type = file_data[offset + 4];
        let node_level = file_data[offset + 5];
        let entries = read_u16(file_data, offset + 6)? as usize;

        let mut pos = offset + 8 + 2 * os;
        ensure_len(file_data, pos, entries * (key_size + os) + key_size)?;

        let mut keys = Vec::with_capacity(entries + 1);
        let mut children = Vec::with_capacity(entries);
        for _ in 0..entries {
            keys.push(file_data[pos..pos + key_size].to_vec());
            pos += key_size;
            children.push(read_uint(file_data, pos, offset_size)?);
            pos += os;
        }
        keys.push(file_data[pos..pos + key_size].to_vec());

        Ok(BTreeV1Node {
            node_type,
            node_level,
            keys,
            children,
        })
    }
}

fn walk_leaves(
    file_data: &[u8],
    address: u64,
    offset_size: u8,
    node_type: u8,
    key_size: usize,
    depth: usize,
    visit: &mut dyn FnMut(&[u8], u64) -> Result<(), FormatError>,
) -> Result<(), FormatError> {
    if depth > MAX_DEPTH {
        return Err(FormatError::ChunkedReadError("B-tree too deep".into()));
    }
    let node = BTreeV1Node::parse(file_data, address as usize, offset_size, key_size)?;
    if node.node_type != node_type {
        return Err(FormatError::InvalidBTreeNodeType(node.node_type));
    }
    for (key, &child) in node.keys.iter().zip(&node.children) {
        if node.node_level == 0 {
            visit(key, child)?;
        } else {
            walk_leaves(
                file_data,
                child,
                offset_size,
                node_type,
                key_size,
                depth + 1,
                visit,
            )?;
        }
    }
    Ok(())
}

/// Collect the addresses of all symbol table nodes of a group, in key order.
pub fn collect_symbol_table_nodes(
    file_data: &[u8],
    btree_address: u64,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<u64>, FormatError> {
    let mut nodes = Vec::new();
    // group keys are heap offsets, stored with the length width
    walk_leaves(
        file_data,
        btree_address,
        offset_size,
        NODE_TYPE_GROUP,
        length_size as usize,
        0,
        &mut |_, child| {
            nodes.push(child);
            Ok(())
        },
    )?;
    Ok(nodes)
}

/// Collect every chunk of a dataset with `rank` dimensions.
pub fn collect_chunks(
    file_data: &[u8],
    btree_address: u64,
    offset_size: u8,
    rank: usize,
) -> Result<Vec<ChunkRecord>, FormatError> {
    // size(4) + filter mask(4) + (rank + 1) 8-byte offsets
    let key_size = 8 + 8 * (rank + 1);
    let mut chunks = Vec::new();
    walk_leaves(
        file_data,
        btree_address,
        offset_size,
        NODE_TYPE_CHUNK,
        key_size,
        0,
        &mut |key, address| {
            let offsets = (0..rank)
                .map(|d| read_uint(key, 8 + 8 * d, 8))
                .collect::<Result<Vec<_>, _>>()?;
            chunks.push(ChunkRecord {
                offsets,
                size: read_u32(key, 0)?,
                filter_mask: read_u32(key, 4)?,
                address,
            });
            Ok(())
        },
    )?;
    Ok(chunks)
}
