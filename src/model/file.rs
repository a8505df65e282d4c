// src/model/file.rs

//! File descriptors
//!
//! A descriptor is resolved once from a frozen file record. Its kind is a
//! closed enum carrying only the attributes that kind has, so a symlink has
//! no size and a directory has no content hash.

use crate::db::stream::FrozenFile;
use crate::error::{Error, Result};
use crate::model::element::{Element, ElementBuilder, Schema};
use crate::model::Resource;
use crate::url::{LinkTarget, ResourceKind, UrlBuilder};
use serde::Serialize;

static REGULAR_SCHEMA: Schema = Schema {
    tag: "File",
    attributes: &["id", "href"],
    fields: &["path", "owner", "group", "mtime", "perms", "size", "sha1"],
};

static DIRECTORY_SCHEMA: Schema = Schema {
    tag: "Directory",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms"],
};

static SYMLINK_SCHEMA: Schema = Schema {
    tag: "Symlink",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms", "target"],
};

static SOCKET_SCHEMA: Schema = Schema {
    tag: "Socket",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms"],
};

static NAMED_PIPE_SCHEMA: Schema = Schema {
    tag: "NamedPipe",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms"],
};

static BLOCK_DEVICE_SCHEMA: Schema = Schema {
    tag: "BlockDevice",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms", "major", "minor"],
};

static CHAR_DEVICE_SCHEMA: Schema = Schema {
    tag: "CharDevice",
    attributes: &["id"],
    fields: &["path", "owner", "group", "mtime", "perms", "major", "minor"],
};

/// Attributes every file kind carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodeInfo {
    pub owner: String,
    pub group: String,
    pub mtime: u64,
    pub perms: u32,
}

/// What kind of file a record describes, with its kind-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum FileKind {
    Regular { size: u64, sha1: String },
    Directory,
    Symlink { target: String },
    Socket,
    NamedPipe,
    BlockDevice { major: u32, minor: u32 },
    CharDevice { major: u32, minor: u32 },
}

impl FileKind {
    /// Dispatch on a frozen record's tag character
    pub fn from_frozen(file: &FrozenFile) -> Result<Self> {
        let corrupt = |what: &str| {
            Error::CorruptRecord(format!("file tagged '{}' has no {what}", file.tag))
        };

        match file.tag {
            '-' => {
                let contents = file.contents().ok_or_else(|| corrupt("contents"))?;
                Ok(FileKind::Regular {
                    size: contents.size,
                    sha1: hex::encode(&contents.sha1),
                })
            }
            'l' => Ok(FileKind::Symlink {
                target: file.target.clone().ok_or_else(|| corrupt("target"))?,
            }),
            'd' => Ok(FileKind::Directory),
            'b' => {
                let devt = file.devt.ok_or_else(|| corrupt("device numbers"))?;
                Ok(FileKind::BlockDevice {
                    major: devt.major,
                    minor: devt.minor,
                })
            }
            'c' => {
                let devt = file.devt.ok_or_else(|| corrupt("device numbers"))?;
                Ok(FileKind::CharDevice {
                    major: devt.major,
                    minor: devt.minor,
                })
            }
            's' => Ok(FileKind::Socket),
            'p' => Ok(FileKind::NamedPipe),
            other => Err(Error::UnknownFileKind(other)),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            FileKind::Regular { .. } => &REGULAR_SCHEMA,
            FileKind::Directory => &DIRECTORY_SCHEMA,
            FileKind::Symlink { .. } => &SYMLINK_SCHEMA,
            FileKind::Socket => &SOCKET_SCHEMA,
            FileKind::NamedPipe => &NAMED_PIPE_SCHEMA,
            FileKind::BlockDevice { .. } => &BLOCK_DEVICE_SCHEMA,
            FileKind::CharDevice { .. } => &CHAR_DEVICE_SCHEMA,
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, FileKind::Regular { .. })
    }
}

/// Metadata of one file, addressed by content id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Link to this descriptor
    pub id: String,
    /// Link to the file contents; regular files only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Path the caller asked about, echoed back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub inode: InodeInfo,
    #[serde(flatten)]
    pub kind: FileKind,
}

impl FileDescriptor {
    /// Resolve a descriptor from a frozen record
    pub fn from_frozen(
        file_id: &str,
        path: Option<&str>,
        file: &FrozenFile,
        urls: &dyn UrlBuilder,
    ) -> Result<Self> {
        let kind = FileKind::from_frozen(file)?;

        let id = urls.make_url(ResourceKind::File, &LinkTarget::key(file_id).sub("info"));
        let href = kind
            .is_regular()
            .then(|| urls.make_url(ResourceKind::File, &LinkTarget::key(file_id).sub("content")));

        Ok(Self {
            id,
            href,
            path: path.map(str::to_string),
            inode: InodeInfo {
                owner: file.inode.owner.clone(),
                group: file.inode.group.clone(),
                mtime: file.inode.mtime,
                perms: file.inode.perms,
            },
            kind,
        })
    }
}

impl Resource for FileDescriptor {
    fn schema(&self) -> &'static Schema {
        self.kind.schema()
    }

    fn to_element(&self, _urls: &dyn UrlBuilder) -> Result<Element> {
        let mut builder = ElementBuilder::new(self.kind.schema()).attr("id", &self.id)?;
        if let Some(ref href) = self.href {
            builder = builder.attr("href", href)?;
        }

        builder = builder
            .text_opt("path", self.path.as_deref())?
            .text("owner", &self.inode.owner)?
            .text("group", &self.inode.group)?
            .unsigned("mtime", self.inode.mtime)?
            .unsigned("perms", u64::from(self.inode.perms))?;

        builder = match &self.kind {
            FileKind::Regular { size, sha1 } => builder.unsigned("size", *size)?.text("sha1", sha1)?,
            FileKind::Symlink { target } => builder.text("target", target)?,
            FileKind::BlockDevice { major, minor } | FileKind::CharDevice { major, minor } => builder
                .unsigned("major", u64::from(*major))?
                .unsigned("minor", u64::from(*minor))?,
            FileKind::Directory | FileKind::Socket | FileKind::NamedPipe => builder,
        };

        Ok(builder.build())
    }
}

/// Content hash and config flag for content delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContentInfo {
    /// Hex encoded SHA-1
    pub sha1: String,
    pub is_config: bool,
}
