//! Builds small HDF5 images in memory for the integration tests.
//!
//! Two layouts are supported: superblock v0 with symbol-table groups and
//! v1 object headers, and superblock v2 with compact link-message groups
//! and v2 object headers. All integers are little-endian and all offsets
//! and lengths are 8 bytes wide.

#![allow(dead_code)]

use h5describe::lookup3;

const UNDEF: u64 = u64::MAX;

/// How a dataset's bytes are stored.
#[derive(Clone, Debug)]
pub enum Storage {
    Contiguous,
    /// Contiguous layout whose storage was never allocated.
    Unallocated,
    Compact,
    /// Chunks indexed by a v1 B-tree, optionally deflated.
    Chunked { chunk: Vec<u64>, deflate: bool },
    /// v4 layout, implicit index (v2 files only).
    Implicit { chunk: Vec<u64> },
}

#[derive(Clone, Debug)]
pub struct Dataset {
    pub shape: Vec<u64>,
    pub element_size: u32,
    pub bytes: Vec<u8>,
    pub storage: Storage,
}

impl Dataset {
    pub fn contiguous(shape: &[u64], element_size: u32, bytes: Vec<u8>) -> Node {
        Node::Dataset(Dataset {
            shape: shape.to_vec(),
            element_size,
            bytes,
            storage: Storage::Contiguous,
        })
    }

    pub fn with_storage(shape: &[u64], element_size: u32, bytes: Vec<u8>, storage: Storage) -> Node {
        Node::Dataset(Dataset {
            shape: shape.to_vec(),
            element_size,
            bytes,
            storage,
        })
    }
}

#[derive(Clone, Debug)]
pub enum Node {
    Group(Vec<(String, Node)>),
    Dataset(Dataset),
    Soft(String),
    External { file: String, path: String },
}

pub fn group(children: Vec<(&str, Node)>) -> Node {
    Node::Group(children.into_iter().map(|(n, c)| (n.to_string(), c)).collect())
}

pub fn external(file: &str, path: &str) -> Node {
    Node::External {
        file: file.into(),
        path: path.into(),
    }
}

/// `u32` values `start, start+1, ...` as little-endian bytes.
pub fn u32_bytes(start: u32, count: usize) -> Vec<u8> {
    (0..count as u32)
        .flat_map(|i| (start + i).to_le_bytes())
        .collect()
}

/// The usual `/entry/data` + `/entry/instrument/detector/detectorSpecific`
/// tree.
pub fn master_tree(data: Vec<(&str, Node)>, detector: Vec<(&str, Node)>) -> Node {
    group(vec![(
        "entry",
        group(vec![
            ("data", group(data)),
            (
                "instrument",
                group(vec![(
                    "detector",
                    group(vec![("detectorSpecific", group(detector))]),
                )]),
            ),
        ]),
    )])
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Version {
    V0,
    V2,
}

struct Writer {
    buf: Vec<u8>,
    version: Version,
}

fn pad8(buf: &mut Vec<u8>) {
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
}

/// Element offsets of every chunk, in row-major chunk order.
fn chunk_origins(shape: &[u64], chunk: &[u64]) -> Vec<Vec<u64>> {
    let grid: Vec<u64> = shape.iter().zip(chunk).map(|(&d, &c)| d.div_ceil(c)).collect();
    let total: u64 = grid.iter().product();
    (0..total)
        .map(|mut linear| {
            let mut origin = vec![0; grid.len()];
            for d in (0..grid.len()).rev() {
                origin[d] = linear % grid[d] * chunk[d];
                linear /= grid[d];
            }
            origin
        })
        .collect()
}

/// Cut one chunk out of a row-major buffer, zero-padding at the edges.
fn extract_chunk(ds: &Dataset, chunk: &[u64], origin: &[u64]) -> Vec<u8> {
    let es = ds.element_size as usize;
    let count: u64 = chunk.iter().product();
    let mut out = vec![0u8; count as usize * es];
    for i in 0..count {
        let mut rest = i;
        let mut coords = vec![0u64; chunk.len()];
        for d in (0..chunk.len()).rev() {
            coords[d] = origin[d] + rest % chunk[d];
            rest /= chunk[d];
        }
        if coords.iter().zip(&ds.shape).any(|(c, dim)| c >= dim) {
            continue;
        }
        let src = coords
            .iter()
            .zip(&ds.shape)
            .fold(0u64, |acc, (c, dim)| acc * dim + c) as usize;
        let o = i as usize * es;
        out[o..o + es].copy_from_slice(&ds.bytes[src * es..(src + 1) * es]);
    }
    out
}

fn zlib(data: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

impl Writer {
    fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    fn put(&mut self, bytes: &[u8]) -> u64 {
        pad8(&mut self.buf);
        let at = self.pos();
        self.buf.extend_from_slice(bytes);
        at
    }

    fn dataspace(&self, shape: &[u64]) -> Vec<u8> {
        let mut m = match self.version {
            Version::V0 => vec![1, shape.len() as u8, 0, 0, 0, 0, 0, 0],
            Version::V2 => vec![2, shape.len() as u8, 0, if shape.is_empty() { 0 } else { 1 }],
        };
        for d in shape {
            m.extend_from_slice(&d.to_le_bytes());
        }
        m
    }

    fn datatype(element_size: u32) -> Vec<u8> {
        let mut m = vec![0x10, 0, 0, 0];
        m.extend_from_slice(&element_size.to_le_bytes());
        m.extend_from_slice(&0u16.to_le_bytes());
        m.extend_from_slice(&((element_size * 8) as u16).to_le_bytes());
        m
    }

    fn deflate_pipeline(&self) -> Vec<u8> {
        match self.version {
            Version::V0 => {
                let mut m = vec![1, 1, 0, 0, 0, 0, 0, 0];
                m.extend_from_slice(&1u16.to_le_bytes()); // deflate
                m.extend_from_slice(&0u16.to_le_bytes()); // name length
                m.extend_from_slice(&0u16.to_le_bytes()); // flags
                m.extend_from_slice(&1u16.to_le_bytes()); // one value
                m.extend_from_slice(&6u32.to_le_bytes());
                m.extend_from_slice(&[0; 4]); // pad odd value count
                m
            }
            Version::V2 => {
                let mut m = vec![2, 1];
                m.extend_from_slice(&1u16.to_le_bytes());
                m.extend_from_slice(&0u16.to_le_bytes());
                m.extend_from_slice(&1u16.to_le_bytes());
                m.extend_from_slice(&6u32.to_le_bytes());
                m
            }
        }
    }

    /// Write a chunk B-tree leaf over already written chunks.
    fn chunk_btree(&mut self, shape: &[u64], chunks: &[(Vec<u64>, u32, u64)]) -> u64 {
        let key = |size: u32, origin: &[u64]| {
            let mut k = size.to_le_bytes().to_vec();
            k.extend_from_slice(&0u32.to_le_bytes());
            for o in origin {
                k.extend_from_slice(&o.to_le_bytes());
            }
            k.extend_from_slice(&0u64.to_le_bytes());
            k
        };
        let mut node = b"TREE".to_vec();
        node.push(1);
        node.push(0);
        node.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
        node.extend_from_slice(&UNDEF.to_le_bytes());
        node.extend_from_slice(&UNDEF.to_le_bytes());
        for (origin, size, address) in chunks {
            node.extend_from_slice(&key(*size, origin));
            node.extend_from_slice(&address.to_le_bytes());
        }
        node.extend_from_slice(&key(0, shape));
        self.put(&node)
    }

    fn dataset_messages(&mut self, ds: &Dataset) -> Vec<(u16, Vec<u8>)> {
        let mut msgs = vec![
            (0x0001, self.dataspace(&ds.shape)),
            (0x0003, Self::datatype(ds.element_size)),
        ];
        match &ds.storage {
            Storage::Contiguous | Storage::Unallocated => {
                let address = if matches!(ds.storage, Storage::Unallocated) {
                    UNDEF
                } else {
                    self.put(&ds.bytes)
                };
                let mut l = vec![3, 1];
                l.extend_from_slice(&address.to_le_bytes());
                l.extend_from_slice(&(ds.bytes.len() as u64).to_le_bytes());
                msgs.push((0x0008, l));
            }
            Storage::Compact => {
                let mut l = vec![3, 0];
                l.extend_from_slice(&(ds.bytes.len() as u16).to_le_bytes());
                l.extend_from_slice(&ds.bytes);
                msgs.push((0x0008, l));
            }
            Storage::Chunked { chunk, deflate } => {
                let mut written = Vec::new();
                for origin in chunk_origins(&ds.shape, chunk) {
                    let raw = extract_chunk(ds, chunk, &origin);
                    let stored = if *deflate { zlib(&raw) } else { raw };
                    let address = self.put(&stored);
                    written.push((origin, stored.len() as u32, address));
                }
                let btree = self.chunk_btree(&ds.shape, &written);
                let mut l = vec![3, 2, chunk.len() as u8 + 1];
                l.extend_from_slice(&btree.to_le_bytes());
                for c in chunk {
                    l.extend_from_slice(&(*c as u32).to_le_bytes());
                }
                l.extend_from_slice(&ds.element_size.to_le_bytes());
                msgs.push((0x0008, l));
                if *deflate {
                    msgs.push((0x000B, self.deflate_pipeline()));
                }
            }
            Storage::Implicit { chunk } => {
                assert!(self.version == Version::V2, "implicit index needs a v2 file");
                pad8(&mut self.buf);
                let base = self.pos();
                for origin in chunk_origins(&ds.shape, chunk) {
                    let raw = extract_chunk(ds, chunk, &origin);
                    self.buf.extend_from_slice(&raw);
                }
                let mut l = vec![4, 2, 0, chunk.len() as u8 + 1, 8];
                for c in chunk {
                    l.extend_from_slice(&c.to_le_bytes());
                }
                l.extend_from_slice(&u64::from(ds.element_size).to_le_bytes());
                l.push(2);
                l.extend_from_slice(&base.to_le_bytes());
                msgs.push((0x0008, l));
            }
        }
        msgs
    }

    fn v1_header(&mut self, msgs: &[(u16, Vec<u8>)]) -> u64 {
        let mut body = Vec::new();
        for (t, data) in msgs {
            let padded = (data.len() + 7) & !7;
            body.extend_from_slice(&t.to_le_bytes());
            body.extend_from_slice(&(padded as u16).to_le_bytes());
            body.extend_from_slice(&[0; 4]);
            body.extend_from_slice(data);
            body.resize(body.len() + padded - data.len(), 0);
        }
        let mut oh = vec![1, 0];
        oh.extend_from_slice(&(msgs.len() as u16).to_le_bytes());
        oh.extend_from_slice(&1u32.to_le_bytes());
        oh.extend_from_slice(&(body.len() as u32).to_le_bytes());
        oh.extend_from_slice(&[0; 4]);
        oh.extend_from_slice(&body);
        self.put(&oh)
    }

    fn v2_header(&mut self, msgs: &[(u16, Vec<u8>)]) -> u64 {
        let mut body = Vec::new();
        for (t, data) in msgs {
            body.push(*t as u8);
            body.extend_from_slice(&(data.len() as u16).to_le_bytes());
            body.push(0);
            body.extend_from_slice(data);
        }
        let mut oh = b"OHDR".to_vec();
        oh.push(2);
        oh.push(0x02); // 4-byte chunk0 size
        oh.extend_from_slice(&(body.len() as u32).to_le_bytes());
        oh.extend_from_slice(&body);
        let sum = lookup3(&oh);
        oh.extend_from_slice(&sum.to_le_bytes());
        self.put(&oh)
    }

    fn header(&mut self, msgs: &[(u16, Vec<u8>)]) -> u64 {
        match self.version {
            Version::V0 => self.v1_header(msgs),
            Version::V2 => self.v2_header(msgs),
        }
    }

    fn node(&mut self, node: &Node) -> u64 {
        match node {
            Node::Dataset(ds) => {
                let msgs = self.dataset_messages(ds);
                self.header(&msgs)
            }
            Node::Group(children) => match self.version {
                Version::V0 => self.symbol_table_group(children),
                Version::V2 => self.link_group(children),
            },
            Node::Soft(_) | Node::External { .. } => panic!("links only exist inside groups"),
        }
    }

    fn symbol_table_group(&mut self, children: &[(String, Node)]) -> u64 {
        let mut sorted: Vec<&(String, Node)> = children.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        // heap segment: "" at 0, then names and soft link values, 8-aligned
        let mut segment = vec![0u8; 8];
        let mut intern = |s: &str| -> u64 {
            let at = segment.len() as u64;
            segment.extend_from_slice(s.as_bytes());
            segment.push(0);
            pad8(&mut segment);
            at
        };
        // (name offset, object address, cache type, scratch)
        let mut entries = Vec::new();
        let mut last_name = 0;
        for (name, child) in &sorted {
            let name_off = intern(name);
            last_name = name_off;
            match child {
                Node::Soft(target) => {
                    let value = intern(target);
                    entries.push((name_off, UNDEF, 2u32, value as u32));
                }
                Node::External { .. } => panic!("v0 groups cannot hold external links"),
                _ => entries.push((name_off, 0, 0, 0)),
            }
        }
        for (entry, (_, child)) in entries.iter_mut().zip(&sorted) {
            if !matches!(child, Node::Soft(_)) {
                entry.1 = self.node(child);
            }
        }

        let segment_at = self.put(&segment);
        let mut heap = b"HEAP".to_vec();
        heap.extend_from_slice(&[0, 0, 0, 0]);
        heap.extend_from_slice(&(segment.len() as u64).to_le_bytes());
        heap.extend_from_slice(&UNDEF.to_le_bytes());
        heap.extend_from_slice(&segment_at.to_le_bytes());
        let heap_at = self.put(&heap);

        let mut snod = b"SNOD".to_vec();
        snod.extend_from_slice(&[1, 0]);
        snod.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (name, addr, cache, scratch) in &entries {
            snod.extend_from_slice(&name.to_le_bytes());
            snod.extend_from_slice(&addr.to_le_bytes());
            snod.extend_from_slice(&cache.to_le_bytes());
            snod.extend_from_slice(&[0; 4]);
            snod.extend_from_slice(&scratch.to_le_bytes());
            snod.extend_from_slice(&[0; 12]);
        }
        let snod_at = self.put(&snod);

        let mut tree = b"TREE".to_vec();
        tree.extend_from_slice(&[0, 0]);
        tree.extend_from_slice(&1u16.to_le_bytes());
        tree.extend_from_slice(&UNDEF.to_le_bytes());
        tree.extend_from_slice(&UNDEF.to_le_bytes());
        tree.extend_from_slice(&0u64.to_le_bytes());
        tree.extend_from_slice(&snod_at.to_le_bytes());
        tree.extend_from_slice(&last_name.to_le_bytes());
        let tree_at = self.put(&tree);

        let mut stab = tree_at.to_le_bytes().to_vec();
        stab.extend_from_slice(&heap_at.to_le_bytes());
        self.v1_header(&[(0x0011, stab)])
    }

    fn link_group(&mut self, children: &[(String, Node)]) -> u64 {
        // link info: no creation order, no fractal heap, no name index
        let mut info = vec![0, 0];
        info.extend_from_slice(&UNDEF.to_le_bytes());
        info.extend_from_slice(&UNDEF.to_le_bytes());
        let mut msgs = vec![(0x0002, info)];
        for (name, child) in children {
            let (link_type, value) = match child {
                Node::Soft(target) => {
                    let mut v = (target.len() as u16).to_le_bytes().to_vec();
                    v.extend_from_slice(target.as_bytes());
                    (1u8, v)
                }
                Node::External { file, path } => {
                    let mut body = vec![0];
                    body.extend_from_slice(file.as_bytes());
                    body.push(0);
                    body.extend_from_slice(path.as_bytes());
                    body.push(0);
                    let mut v = (body.len() as u16).to_le_bytes().to_vec();
                    v.extend_from_slice(&body);
                    (64, v)
                }
                other => (0, self.node(other).to_le_bytes().to_vec()),
            };
            let mut m = vec![1, 0x08, link_type, name.len() as u8];
            m.extend_from_slice(name.as_bytes());
            m.extend_from_slice(&value);
            msgs.push((0x0006, m));
        }
        self.v2_header(&msgs)
    }
}

/// A v0 file: symbol-table groups, v1 object headers.
pub fn v0_file(root: &Node) -> Vec<u8> {
    build(root, Version::V0, 0)
}

/// A v2 file: link-message groups, v2 object headers.
pub fn v2_file(root: &Node) -> Vec<u8> {
    build(root, Version::V2, 0)
}

/// A v2 file behind a user block of `userblock` bytes filled with `fill`.
///
/// `userblock` must be 512 or a larger power of two.
pub fn v2_file_with_userblock(root: &Node, userblock: usize, fill: u8) -> Vec<u8> {
    let mut file = build(root, Version::V2, userblock);
    file[..userblock].fill(fill);
    file
}

fn build(root: &Node, version: Version, userblock: usize) -> Vec<u8> {
    let sb_len = match version {
        Version::V0 => 24 + 4 * 8 + 40,
        Version::V2 => 48,
    };
    let mut w = Writer {
        buf: vec![0u8; sb_len],
        version,
    };
    let root_at = w.node(root);
    pad8(&mut w.buf);
    let eof = w.pos();

    let mut sb = h5describe_format::signature::HDF5_SIGNATURE.to_vec();
    match version {
        Version::V0 => {
            sb.extend_from_slice(&[0, 0, 0, 0, 0, 8, 8, 0]);
            sb.extend_from_slice(&4u16.to_le_bytes());
            sb.extend_from_slice(&16u16.to_le_bytes());
            sb.extend_from_slice(&0u32.to_le_bytes());
            sb.extend_from_slice(&(userblock as u64).to_le_bytes());
            sb.extend_from_slice(&UNDEF.to_le_bytes());
            sb.extend_from_slice(&eof.to_le_bytes());
            sb.extend_from_slice(&UNDEF.to_le_bytes());
            // root symbol table entry
            sb.extend_from_slice(&0u64.to_le_bytes());
            sb.extend_from_slice(&root_at.to_le_bytes());
            sb.extend_from_slice(&[0; 24]);
        }
        Version::V2 => {
            sb.extend_from_slice(&[2, 8, 8, 0]);
            sb.extend_from_slice(&(userblock as u64).to_le_bytes());
            sb.extend_from_slice(&UNDEF.to_le_bytes());
            sb.extend_from_slice(&eof.to_le_bytes());
            sb.extend_from_slice(&root_at.to_le_bytes());
            let sum = lookup3(&sb);
            sb.extend_from_slice(&sum.to_le_bytes());
        }
    }
    assert_eq!(sb.len(), sb_len);
    w.buf[..sb_len].copy_from_slice(&sb);

    let mut file = vec![0u8; userblock];
    file.extend_from_slice(&w.buf);
    file
}
