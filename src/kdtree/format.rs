//! Binary cache format for packed k-d trees.
//!
//! All integers are little-endian.
//!
//! ```text
//! [u64 node count][u64 node byte size][u64 base]
//! node * count:
//!     [content: size_of::<T>() bytes][u32 axis][u32 child 0][u32 child 1]
//! ```
//!
//! Child references are `index + base`, or `u32::MAX` for a missing child.
//! The writer stores base 0; the reader subtracts whatever base the file
//! declares. The node byte size guards against reading a cache written for a
//! different element layout.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::mem::size_of;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytemuck::Pod;
use memmap2::Mmap;

use super::node::{KdContent, PackedKdNode};
use super::KdTree;
use crate::tree::{NodeIndex, NO_CHILD};
use crate::util::{Axis, Error, Result};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 24;

/// Bytes following the content in every node: axis and two child references.
pub const NODE_TAIL_SIZE: usize = 12;

impl<T: KdContent + Pod> KdTree<T> {
    /// Serialized size of one node.
    #[inline]
    pub fn node_byte_size() -> usize {
        size_of::<T>() + NODE_TAIL_SIZE
    }

    /// Write the packed tree. Fails with [`Error::NotPacked`] on a linked tree.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let nodes = self.packed_nodes().ok_or(Error::NotPacked)?;

        writer.write_u64::<LittleEndian>(nodes.len() as u64)?;
        writer.write_u64::<LittleEndian>(Self::node_byte_size() as u64)?;
        writer.write_u64::<LittleEndian>(0)?;

        for node in nodes {
            writer.write_all(bytemuck::bytes_of(&node.content))?;
            writer.write_u32::<LittleEndian>(node.axis as u32)?;
            for child in node.children {
                writer.write_u32::<LittleEndian>(child)?;
            }
        }
        Ok(())
    }

    /// Read a tree written by [`KdTree::write_to`]. The result is packed.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let (count, base) = read_header::<_, T>(reader)?;
        let body_len = body_len::<T>(count)?;

        let mut body = Vec::new();
        reader.take(body_len as u64).read_to_end(&mut body)?;
        if body.len() != body_len {
            return Err(Error::invalid(format!(
                "truncated node array: expected {body_len} bytes, got {}",
                body.len()
            )));
        }
        Ok(Self::from_packed(parse_nodes(&body, count, base)?))
    }

    /// Write the packed tree to a file.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_packed() {
            return Err(Error::NotPacked);
        }
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a cache file through a memory map.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        // SAFETY: the map is only read while `mmap` is alive, and the nodes
        // are copied out before it is dropped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;

        let mut bytes: &[u8] = &mmap;
        let (count, base) = read_header::<_, T>(&mut bytes)?;
        let body_len = body_len::<T>(count)?;
        if bytes.len() < body_len {
            return Err(Error::invalid(format!(
                "truncated node array: expected {body_len} bytes, got {}",
                bytes.len()
            )));
        }
        let tree = Self::from_packed(parse_nodes(&bytes[..body_len], count, base)?);
        tracing::debug!("loaded k-d tree: {}", tree.stats());
        Ok(tree)
    }
}

fn read_header<R: Read, T>(reader: &mut R) -> Result<(usize, u64)> {
    let count = reader.read_u64::<LittleEndian>()?;
    let node_size = reader.read_u64::<LittleEndian>()?;
    let base = reader.read_u64::<LittleEndian>()?;

    let expected = size_of::<T>() + NODE_TAIL_SIZE;
    if node_size != expected as u64 {
        return Err(Error::NodeSizeMismatch {
            expected,
            found: node_size as usize,
        });
    }
    if count == 0 {
        return Err(Error::invalid("tree has no nodes"));
    }
    if count >= NO_CHILD as u64 {
        return Err(Error::invalid(format!("node count {count} exceeds index range")));
    }
    Ok((count as usize, base))
}

fn body_len<T>(count: usize) -> Result<usize> {
    count
        .checked_mul(size_of::<T>() + NODE_TAIL_SIZE)
        .ok_or_else(|| Error::invalid("node array size overflows"))
}

fn parse_nodes<T: Pod>(body: &[u8], count: usize, base: u64) -> Result<Vec<PackedKdNode<T>>> {
    let content_size = size_of::<T>();
    let mut nodes = Vec::with_capacity(count);

    for (index, chunk) in body.chunks_exact(content_size + NODE_TAIL_SIZE).enumerate() {
        let content: T = bytemuck::pod_read_unaligned(&chunk[..content_size]);
        let mut tail = &chunk[content_size..];

        let axis = match tail.read_u32::<LittleEndian>()? {
            a @ 0..=2 => Axis::from_index(a as usize),
            a => return Err(Error::invalid(format!("node {index}: bad axis {a}"))),
        };
        let mut children = [NO_CHILD; 2];
        for child in &mut children {
            let stored = tail.read_u32::<LittleEndian>()?;
            if stored == NO_CHILD {
                continue;
            }
            *child = rebase(stored, base, index, count)?;
        }

        nodes.push(PackedKdNode {
            content,
            axis,
            children,
        });
    }
    Ok(nodes)
}

fn rebase(stored: NodeIndex, base: u64, parent: usize, count: usize) -> Result<NodeIndex> {
    match (stored as u64).checked_sub(base) {
        Some(index) if (index as usize) < count && index as usize > parent => Ok(index as NodeIndex),
        _ => Err(Error::invalid(format!(
            "node {parent}: child reference {stored} (base {base}) is out of range"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;
    use std::io::Cursor;

    fn packed_tree() -> KdTree<Vec3> {
        let points: Vec<Vec3> = (0..9)
            .map(|i| Vec3::new(i as f32, (i * 7 % 5) as f32, (i * 3 % 4) as f32))
            .collect();
        let mut tree = crate::kdtree::KdTreeBuilder::default().build(points).unwrap();
        tree.pack().unwrap();
        tree
    }

    #[test]
    fn test_header_layout() {
        let tree = packed_tree();
        let mut bytes = Vec::new();
        tree.write_to(&mut bytes).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + 9 * (12 + NODE_TAIL_SIZE));
        assert_eq!(&bytes[0..8], &9u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &24u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &0u64.to_le_bytes());
    }

    #[test]
    fn test_linked_tree_is_not_written() {
        let tree = crate::kdtree::KdTreeBuilder::default()
            .build(vec![Vec3::ZERO])
            .unwrap();
        let err = tree.write_to(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::NotPacked));
    }

    #[test]
    fn test_node_size_mismatch() {
        let mut bytes = Vec::new();
        packed_tree().write_to(&mut bytes).unwrap();
        bytes[8] = 99;
        let err = KdTree::<Vec3>::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::NodeSizeMismatch { expected: 24, found: 99 }));
    }

    #[test]
    fn test_nonzero_base_is_rebased() {
        let tree = packed_tree();
        let mut bytes = Vec::new();
        tree.write_to(&mut bytes).unwrap();

        // Shift every stored child reference by 100 and declare base 100.
        bytes[16..24].copy_from_slice(&100u64.to_le_bytes());
        for node in 0..9 {
            let tail = HEADER_SIZE + node * 24 + 12 + 4;
            for slot in 0..2 {
                let at = tail + slot * 4;
                let stored = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
                if stored != NO_CHILD {
                    bytes[at..at + 4].copy_from_slice(&(stored + 100).to_le_bytes());
                }
            }
        }

        let read = KdTree::<Vec3>::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.packed_nodes(), tree.packed_nodes());
    }

    #[test]
    fn test_truncated_and_bad_reference() {
        let mut bytes = Vec::new();
        packed_tree().write_to(&mut bytes).unwrap();

        let short = bytes[..bytes.len() - 5].to_vec();
        assert!(matches!(
            KdTree::<Vec3>::read_from(&mut Cursor::new(short)),
            Err(Error::InvalidFormat(_))
        ));

        // Root's first child pointing past the array.
        let at = HEADER_SIZE + 12 + 4;
        bytes[at..at + 4].copy_from_slice(&50u32.to_le_bytes());
        assert!(matches!(
            KdTree::<Vec3>::read_from(&mut Cursor::new(bytes)),
            Err(Error::InvalidFormat(_))
        ));
    }
}
