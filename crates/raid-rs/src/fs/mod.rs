//! A minimal but real inode filesystem (C5) built entirely on the façade's
//! `get`/`put` -- it never touches the RAID-5 client or stripe mapper
//! directly, so its own correctness rests entirely on the façade upholding
//! the invariants in the block layer beneath it.
//!
//! Layout, from logical block 0: one superblock block, an inode table
//! (fixed-size records packed several to a block), a free-block bitmap, and
//! finally the data region referenced by inode direct pointers. This
//! generalizes the teacher's single flat `raidfs` entry table into a real
//! tree, the way `retention::volume` generalizes a single disk into a
//! striped array.

pub mod bitmap;
pub mod constants;
pub mod dir;
pub mod inode;


use std::sync::Arc;

use bitmap::Bitmap;
use constants::{
    DIRECT_POINTERS, DIR_ENTRY_SIZE, INODE_RECORD_SIZE, MAGIC, NAME_LEN, ROOT_INODE,
    SUPERBLOCK_BLOCK, VERSION,
};
use dir::DirEntry;
use inode::{Inode, InodeKind};

use crate::client::ServerProxy;
use crate::facade::Facade;

/// Geometry of the on-disk filesystem, derived once from the device's
/// `BLOCK_SIZE`/`TOTAL_NUM_BLOCKS` and held for the lifetime of the mount.
#[derive(Clone, Debug)]
struct Layout {
    block_size: usize,
    inodes_per_block: usize,
    inode_table_start: u64,
    inode_table_blocks: u64,
    max_inodes: u64,
    bitmap_start: u64,
    bitmap_blocks: u64,
    data_start: u64,
    data_blocks: u64,
}

impl Layout {
    fn compute(block_size: usize, total_num_blocks: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            block_size >= INODE_RECORD_SIZE,
            "block size {block_size} is too small to hold a single inode record ({INODE_RECORD_SIZE} bytes)"
        );

        let inodes_per_block = block_size / INODE_RECORD_SIZE;
        let inode_table_blocks = (total_num_blocks / 8).max(1);
        let max_inodes = inode_table_blocks * inodes_per_block as u64;

        let reserved = 1 + inode_table_blocks;
        anyhow::ensure!(
            total_num_blocks > reserved,
            "device has only {total_num_blocks} blocks, not enough to host a superblock and inode table"
        );
        let remaining = total_num_blocks - reserved;

        let bitmap_bytes = remaining.div_ceil(8);
        let bitmap_blocks = bitmap_bytes.div_ceil(block_size as u64).max(1);
        anyhow::ensure!(
            remaining > bitmap_blocks,
            "device has only {total_num_blocks} blocks, not enough to host a free bitmap and any data"
        );
        let data_blocks = remaining - bitmap_blocks;

        Ok(Self {
            block_size,
            inodes_per_block,
            inode_table_start: 1,
            inode_table_blocks,
            max_inodes,
            bitmap_start: 1 + inode_table_blocks,
            bitmap_blocks,
            data_start: 1 + inode_table_blocks + bitmap_blocks,
            data_blocks,
        })
    }

    fn inode_location(&self, inode: u64) -> (u64, usize) {
        let block = self.inode_table_start + inode / self.inodes_per_block as u64;
        let offset = (inode % self.inodes_per_block as u64) as usize * INODE_RECORD_SIZE;
        (block, offset)
    }
}

/// The geometry constants named in the dump file header: the fixed inode
/// record size, the inode count and free-block-bitmap size this device's
/// layout computes to, and the logical block the data region starts at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FsGeometry {
    pub inode_size: usize,
    pub max_inodes: u64,
    pub bitmap_blocks: u64,
    pub data_start: u64,
}

/// `compute_geometry` derives the filesystem's geometry constants for a
/// device of this shape, without mounting it. Used by the dump codec so a
/// dump's header can name the filesystem layout it was taken from.
///
/// # Errors
/// Returns an error under the same conditions as [`Layout::compute`]: the
/// device is too small to host a superblock, inode table, and free bitmap.
pub fn compute_geometry(block_size: usize, total_num_blocks: u64) -> anyhow::Result<FsGeometry> {
    let layout = Layout::compute(block_size, total_num_blocks)?;
    Ok(FsGeometry {
        inode_size: INODE_RECORD_SIZE,
        max_inodes: layout.max_inodes,
        bitmap_blocks: layout.bitmap_blocks,
        data_start: layout.data_start,
    })
}

fn superblock_bytes(layout: &Layout) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(layout.max_inodes).to_le_bytes());
    out.extend_from_slice(&(layout.data_blocks).to_le_bytes());
    out
}

fn validate_superblock(bytes: &[u8], layout: &Layout) -> anyhow::Result<()> {
    anyhow::ensure!(bytes.len() >= 8, "superblock truncated");
    anyhow::ensure!(bytes[..8] == MAGIC, "not a raid filesystem (bad magic)");
    let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    anyhow::ensure!(version == VERSION, "unsupported filesystem version {version}");
    let max_inodes = u64::from_le_bytes(bytes[12..20].try_into().unwrap());
    anyhow::ensure!(
        max_inodes == layout.max_inodes,
        "superblock inode count {max_inodes} does not match computed layout {}",
        layout.max_inodes
    );
    Ok(())
}

/// `FileSystem` is the C5 entry point: path-based operations over a
/// [`Facade`], backed by an inode table, a free-block bitmap, and
/// directory-entry blocks.
pub struct FileSystem<P: ServerProxy> {
    facade: Arc<Facade<P>>,
    layout: Layout,
}

impl<P: ServerProxy> FileSystem<P> {
    /// `format` initializes a fresh filesystem: writes the superblock,
    /// zeroes the inode table, and creates the root directory.
    ///
    /// # Errors
    /// Returns an error if the device is too small to host a filesystem, or
    /// if any underlying façade call fails.
    pub async fn format(facade: Arc<Facade<P>>, block_size: usize, total_num_blocks: u64) -> anyhow::Result<Self> {
        let layout = Layout::compute(block_size, total_num_blocks)?;

        let mut superblock = superblock_bytes(&layout);
        superblock.resize(block_size, 0);
        facade.put(SUPERBLOCK_BLOCK, &superblock).await?;

        let fs = Self { facade, layout };

        for inode in 0..fs.layout.max_inodes {
            fs.write_inode(inode, &Inode::free()).await?;
        }
        for bitmap_block in 0..fs.layout.bitmap_blocks {
            fs.facade
                .put(fs.layout.bitmap_start + bitmap_block, &vec![0u8; block_size])
                .await?;
        }

        let root = Inode {
            kind: InodeKind::Directory,
            size: 0,
            link_count: 2,
            blocks: Vec::new(),
            inline: Vec::new(),
        };
        fs.write_inode(ROOT_INODE, &root).await?;

        Ok(fs)
    }

    /// `mount` opens an already-formatted device, validating the stored
    /// superblock against the geometry implied by `block_size`/`total_num_blocks`.
    ///
    /// # Errors
    /// Returns an error if the superblock is missing, has a bad magic or
    /// version, or does not match the computed layout.
    pub async fn mount(facade: Arc<Facade<P>>, block_size: usize, total_num_blocks: u64) -> anyhow::Result<Self> {
        let layout = Layout::compute(block_size, total_num_blocks)?;
        let superblock = facade.get(SUPERBLOCK_BLOCK).await?;
        validate_superblock(&superblock, &layout)?;
        Ok(Self { facade, layout })
    }

    async fn read_inode(&self, inode: u64) -> anyhow::Result<Inode> {
        anyhow::ensure!(inode < self.layout.max_inodes, "inode {inode} out of range");
        let (block, offset) = self.layout.inode_location(inode);
        let data = self.facade.get(block).await?;
        Inode::from_bytes(&data[offset..offset + INODE_RECORD_SIZE])
    }

    async fn write_inode(&self, inode: u64, value: &Inode) -> anyhow::Result<()> {
        anyhow::ensure!(inode < self.layout.max_inodes, "inode {inode} out of range");
        let (block, offset) = self.layout.inode_location(inode);
        let mut data = self.facade.get(block).await?;
        let record = value.to_bytes();
        data[offset..offset + INODE_RECORD_SIZE].copy_from_slice(&record);
        self.facade.put(block, &data).await
    }

    async fn allocate_inode(&self) -> anyhow::Result<u64> {
        for candidate in ROOT_INODE + 1..self.layout.max_inodes {
            if self.read_inode(candidate).await?.is_free() {
                return Ok(candidate);
            }
        }
        anyhow::bail!("inode table exhausted ({} inodes)", self.layout.max_inodes)
    }

    async fn read_bitmap(&self) -> anyhow::Result<Bitmap> {
        let mut bytes = Vec::with_capacity((self.layout.bitmap_blocks as usize) * self.layout.block_size);
        for b in 0..self.layout.bitmap_blocks {
            bytes.extend_from_slice(&self.facade.get(self.layout.bitmap_start + b).await?);
        }
        Ok(Bitmap::from_bytes(&bytes, self.layout.data_blocks as usize))
    }

    async fn write_bitmap(&self, bitmap: &Bitmap) -> anyhow::Result<()> {
        let mut bytes = bitmap.to_bytes().to_vec();
        bytes.resize((self.layout.bitmap_blocks as usize) * self.layout.block_size, 0);
        for b in 0..self.layout.bitmap_blocks {
            let start = b as usize * self.layout.block_size;
            self.facade
                .put(self.layout.bitmap_start + b, &bytes[start..start + self.layout.block_size])
                .await?;
        }
        Ok(())
    }

    async fn allocate_block(&self) -> anyhow::Result<u64> {
        let mut bitmap = self.read_bitmap().await?;
        let slot = bitmap
            .allocate()
            .ok_or_else(|| anyhow::anyhow!("data region exhausted ({} blocks)", self.layout.data_blocks))?;
        self.write_bitmap(&bitmap).await?;
        Ok(self.layout.data_start + slot as u64)
    }

    async fn free_blocks(&self, blocks: &[u64]) -> anyhow::Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        let mut bitmap = self.read_bitmap().await?;
        for &b in blocks {
            bitmap.clear((b - self.layout.data_start) as usize);
        }
        self.write_bitmap(&bitmap).await
    }

    fn split_path(path: &str) -> anyhow::Result<Vec<&str>> {
        let parts: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        for part in &parts {
            anyhow::ensure!(dir::is_valid_name(part), "invalid path component {part:?}");
        }
        Ok(parts)
    }

    async fn read_dir_entries(&self, dir_inode: &Inode) -> anyhow::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for &block in &dir_inode.blocks {
            entries.extend(dir::decode_entries(&self.facade.get(block).await?));
        }
        Ok(entries)
    }

    async fn lookup_in_dir(&self, dir_inode: &Inode, name: &str) -> anyhow::Result<Option<u64>> {
        Ok(self
            .read_dir_entries(dir_inode)
            .await?
            .into_iter()
            .find(|e| e.name == name)
            .map(|e| e.inode))
    }

    /// Appends one directory entry, allocating a fresh data block if every
    /// existing block is full.
    async fn add_dir_entry(&self, dir_num: u64, dir_inode: &mut Inode, entry: DirEntry) -> anyhow::Result<()> {
        let entries_per_block = self.layout.block_size / DIR_ENTRY_SIZE;

        for &block in &dir_inode.blocks {
            let mut data = self.facade.get(block).await?;
            let count = dir::decode_entries(&data).len();
            if count < entries_per_block {
                let offset = count * DIR_ENTRY_SIZE;
                data[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
                self.facade.put(block, &data).await?;
                dir_inode.size += DIR_ENTRY_SIZE as u64;
                self.write_inode(dir_num, dir_inode).await?;
                return Ok(());
            }
        }

        anyhow::ensure!(
            dir_inode.blocks.len() < DIRECT_POINTERS,
            "directory has no room for another entry (all {DIRECT_POINTERS} direct blocks full)"
        );
        let new_block = self.allocate_block().await?;
        let mut data = vec![0u8; self.layout.block_size];
        data[..DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        self.facade.put(new_block, &data).await?;

        dir_inode.blocks.push(new_block);
        dir_inode.size += DIR_ENTRY_SIZE as u64;
        self.write_inode(dir_num, dir_inode).await
    }

    async fn remove_dir_entry(&self, dir_num: u64, dir_inode: &mut Inode, name: &str) -> anyhow::Result<u64> {
        for &block in &dir_inode.blocks {
            let mut data = self.facade.get(block).await?;
            let entries = dir::decode_entries(&data);
            if let Some(pos) = entries.iter().position(|e| e.name == name) {
                let removed = entries[pos].inode;
                let offset = pos * DIR_ENTRY_SIZE;
                data[offset..offset + DIR_ENTRY_SIZE].fill(0);
                self.facade.put(block, &data).await?;
                dir_inode.size -= DIR_ENTRY_SIZE as u64;
                self.write_inode(dir_num, dir_inode).await?;
                return Ok(removed);
            }
        }
        anyhow::bail!("no such entry {name:?}")
    }

    /// Resolves `path` to `(inode_number, inode)`. An empty or `/` path
    /// resolves to the root directory.
    async fn resolve(&self, path: &str) -> anyhow::Result<(u64, Inode)> {
        let parts = Self::split_path(path)?;
        let mut current_num = ROOT_INODE;
        let mut current = self.read_inode(ROOT_INODE).await?;

        for part in parts {
            anyhow::ensure!(current.kind == InodeKind::Directory, "{part:?}: not a directory");
            let next = self
                .lookup_in_dir(&current, part)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no such file or directory: {part:?}"))?;
            current_num = next;
            current = self.read_inode(next).await?;
        }

        Ok((current_num, current))
    }

    async fn resolve_parent<'a>(&self, parts: &'a [&'a str]) -> anyhow::Result<(u64, Inode, &'a str)> {
        anyhow::ensure!(!parts.is_empty(), "path has no final component");
        let (leading, last) = parts.split_at(parts.len() - 1);

        let mut current_num = ROOT_INODE;
        let mut current = self.read_inode(ROOT_INODE).await?;
        for part in leading {
            let next = self
                .lookup_in_dir(&current, part)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no such directory: {part:?}"))?;
            current_num = next;
            current = self.read_inode(next).await?;
        }

        Ok((current_num, current, last[0]))
    }

    /// `mkdir_all` creates `path` and any missing ancestor directories,
    /// analogous to `mkdir -p`.
    ///
    /// # Errors
    /// Returns an error if a path component exists and is not a directory,
    /// or if the inode table or data region is exhausted.
    pub async fn mkdir_all(&self, path: &str) -> anyhow::Result<()> {
        let parts = Self::split_path(path)?;
        let mut current_num = ROOT_INODE;
        let mut current = self.read_inode(ROOT_INODE).await?;

        for part in parts {
            match self.lookup_in_dir(&current, part).await? {
                Some(next) => {
                    let next_inode = self.read_inode(next).await?;
                    anyhow::ensure!(next_inode.kind == InodeKind::Directory, "{part:?} exists and is not a directory");
                    current_num = next;
                    current = next_inode;
                }
                None => {
                    let new_num = self.allocate_inode().await?;
                    let new_dir = Inode {
                        kind: InodeKind::Directory,
                        size: 0,
                        link_count: 2,
                        blocks: Vec::new(),
                        inline: Vec::new(),
                    };
                    self.write_inode(new_num, &new_dir).await?;
                    self.add_dir_entry(
                        current_num,
                        &mut current,
                        DirEntry { inode: new_num, name: part.to_string() },
                    )
                    .await?;
                    current_num = new_num;
                    current = new_dir;
                }
            }
        }

        Ok(())
    }

    /// `create` makes an empty regular file at `path`; the parent directory
    /// must already exist.
    ///
    /// # Errors
    /// Returns an error if the parent does not exist, is not a directory,
    /// or already has an entry with this name.
    pub async fn create(&self, path: &str) -> anyhow::Result<()> {
        let parts = Self::split_path(path)?;
        let (parent_num, mut parent, name) = self.resolve_parent(&parts).await?;
        anyhow::ensure!(parent.kind == InodeKind::Directory, "parent is not a directory");
        anyhow::ensure!(
            self.lookup_in_dir(&parent, name).await?.is_none(),
            "{name:?} already exists"
        );

        let file_num = self.allocate_inode().await?;
        let file = Inode {
            kind: InodeKind::File,
            size: 0,
            link_count: 1,
            blocks: Vec::new(),
            inline: Vec::new(),
        };
        self.write_inode(file_num, &file).await?;
        self.add_dir_entry(parent_num, &mut parent, DirEntry { inode: file_num, name: name.to_string() })
            .await
    }

    /// `write` overwrites a regular file's full contents.
    ///
    /// # Errors
    /// Returns an error if `path` does not resolve to a regular file, or if
    /// `data` would not fit in [`DIRECT_POINTERS`] blocks.
    pub async fn write(&self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        let (file_num, mut file) = self.resolve(path).await?;
        anyhow::ensure!(file.kind == InodeKind::File, "{path:?} is not a regular file");

        let needed = data.len().div_ceil(self.layout.block_size).max(1);
        anyhow::ensure!(
            needed <= DIRECT_POINTERS,
            "file of {} bytes needs {needed} blocks, more than the {DIRECT_POINTERS} direct pointers supported"
        );

        while file.blocks.len() < needed {
            file.blocks.push(self.allocate_block().await?);
        }
        if file.blocks.len() > needed {
            let freed: Vec<u64> = file.blocks.split_off(needed);
            self.free_blocks(&freed).await?;
        }

        for (i, block) in file.blocks.iter().enumerate() {
            let start = i * self.layout.block_size;
            let end = (start + self.layout.block_size).min(data.len());
            let mut chunk = vec![0u8; self.layout.block_size];
            chunk[..end - start].copy_from_slice(&data[start..end]);
            self.facade.put(*block, &chunk).await?;
        }

        file.size = data.len() as u64;
        self.write_inode(file_num, &file).await
    }

    /// `read` returns a regular file's full contents.
    ///
    /// # Errors
    /// Returns an error if `path` does not resolve to a regular file.
    pub async fn read(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let (_, file) = self.resolve(path).await?;
        anyhow::ensure!(file.kind == InodeKind::File, "{path:?} is not a regular file");

        let mut out = Vec::with_capacity(file.size as usize);
        for &block in &file.blocks {
            out.extend_from_slice(&self.facade.get(block).await?);
        }
        out.truncate(file.size as usize);
        Ok(out)
    }

    /// `symlink` creates a symlink at `path` pointing at `target`.
    ///
    /// # Errors
    /// Returns an error if the parent does not exist, or `target` is longer
    /// than this filesystem's inline payload ([`NAME_LEN`] bytes).
    pub async fn symlink(&self, target: &str, path: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            target.len() <= NAME_LEN,
            "symlink target {target:?} exceeds {NAME_LEN} bytes (no indirect storage for symlinks)"
        );

        let parts = Self::split_path(path)?;
        let (parent_num, mut parent, name) = self.resolve_parent(&parts).await?;
        anyhow::ensure!(
            self.lookup_in_dir(&parent, name).await?.is_none(),
            "{name:?} already exists"
        );

        let link_num = self.allocate_inode().await?;
        let link = Inode {
            kind: InodeKind::Symlink,
            size: target.len() as u64,
            link_count: 1,
            blocks: Vec::new(),
            inline: target.as_bytes().to_vec(),
        };
        self.write_inode(link_num, &link).await?;
        self.add_dir_entry(parent_num, &mut parent, DirEntry { inode: link_num, name: name.to_string() })
            .await
    }

    /// `readlink` returns a symlink's stored target.
    ///
    /// # Errors
    /// Returns an error if `path` does not resolve to a symlink.
    pub async fn readlink(&self, path: &str) -> anyhow::Result<String> {
        let (_, link) = self.resolve(path).await?;
        anyhow::ensure!(link.kind == InodeKind::Symlink, "{path:?} is not a symlink");
        Ok(String::from_utf8_lossy(&link.inline).into_owned())
    }

    /// `unlink` removes a file or symlink (not a directory) from its parent
    /// and frees its inode and data blocks.
    ///
    /// # Errors
    /// Returns an error if `path` resolves to a directory, or has no entry.
    pub async fn unlink(&self, path: &str) -> anyhow::Result<()> {
        let parts = Self::split_path(path)?;
        let (parent_num, mut parent, name) = self.resolve_parent(&parts).await?;
        let target_num = self
            .lookup_in_dir(&parent, name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no such file: {name:?}"))?;
        let target = self.read_inode(target_num).await?;
        anyhow::ensure!(target.kind != InodeKind::Directory, "{name:?} is a directory; refusing to unlink");

        self.remove_dir_entry(parent_num, &mut parent, name).await?;
        self.free_blocks(&target.blocks).await?;
        self.write_inode(target_num, &Inode::free()).await
    }

    /// `stat` resolves `path` and returns its inode metadata.
    ///
    /// # Errors
    /// Returns an error if `path` does not exist.
    pub async fn stat(&self, path: &str) -> anyhow::Result<Inode> {
        Ok(self.resolve(path).await?.1)
    }

    /// `list_dir` returns the names and inode numbers of a directory's entries.
    ///
    /// # Errors
    /// Returns an error if `path` does not resolve to a directory.
    pub async fn list_dir(&self, path: &str) -> anyhow::Result<Vec<DirEntry>> {
        let (_, dir_inode) = self.resolve(path).await?;
        anyhow::ensure!(dir_inode.kind == InodeKind::Directory, "{path:?} is not a directory");
        self.read_dir_entries(&dir_inode).await
    }
}
