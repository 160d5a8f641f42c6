//! Field containers and the comment lock.
//!
//! Every container of a message (header, metadata, each data block) holds
//! its comments first and its fields after. [`Builder`] enforces that order
//! with two phases: comments are accepted in [`Phase::Comments`], and the
//! first field set moves the container to [`Phase::Data`] for good.
//!
//! ```rust
//! use ccsds_ndm::container::{Builder, Phase};
//! use ccsds_ndm::{Error, Header, Token};
//!
//! let mut header = Builder::new(Header::default());
//! header.add_comment(&Token::entry("COMMENT", "first", None, 2, "opm")).unwrap();
//! header.fields().originator = Some("JAXA".to_string());
//! assert_eq!(header.phase(), Phase::Data);
//!
//! let late = Token::entry("COMMENT", "too late", None, 4, "opm");
//! assert!(matches!(header.add_comment(&late), Err(Error::CommentNotAllowed { line: 4, .. })));
//! ```
//!
//! Mandatory keywords and declared counts are not checked while tokens are
//! processed: a document may legitimately set them in any order. They are
//! checked by [`Validate`] when the document is built.

use crate::error::{Error, Result};
use crate::options::Syntax;
use crate::token::Token;

/// Containers holding an ordered list of comments.
pub trait Commented {
    fn comments(&self) -> &[String];

    fn comments_mut(&mut self) -> &mut Vec<String>;
}

/// Build-time checks of a container.
pub trait Validate {
    /// Checks mandatory keywords and declared counts.
    fn validate(&self, source: &str) -> Result<()>;
}

/// Data blocks whose keywords are looked up in a static table.
pub trait Block: Commented + Default {
    type Key: Copy;

    /// Name of the block in error messages.
    const NAME: &'static str;

    fn lookup(keyword: &str) -> Option<Self::Key>;

    fn set(&mut self, key: Self::Key, token: &Token) -> Result<()>;
}

/// Phase of a [`Builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Comments,
    Data,
}

/// Two-phase builder enforcing the comment lock on a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Builder<T> {
    value: T,
    phase: Phase,
}

impl<T: Commented + Default> Default for Builder<T> {
    fn default() -> Self {
        Builder::new(T::default())
    }
}

impl<T: Commented> Builder<T> {
    pub fn new(value: T) -> Self {
        Builder {
            value,
            phase: Phase::Comments,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn accepts_comments(&self) -> bool {
        self.phase == Phase::Comments
    }

    /// Appends the text of a comment token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommentNotAllowed`] once a field has been set.
    pub fn add_comment(&mut self, token: &Token) -> Result<()> {
        if !self.accepts_comments() {
            return Err(Error::comment_not_allowed(token));
        }
        self.value.comments_mut().push(token.value.clone());
        Ok(())
    }

    /// Mutable access to the fields, which closes the comment phase.
    pub fn fields(&mut self) -> &mut T {
        self.phase = Phase::Data;
        &mut self.value
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Comments read before the container they belong to is known.
///
/// In KVN the data blocks of single-segment messages have no markers, so a
/// comment is held here until the next keyword tells which block it opens.
#[derive(Debug, Clone, Default)]
pub struct PendingComments {
    tokens: Vec<Token>,
}

impl PendingComments {
    pub fn push(&mut self, token: &Token) {
        self.tokens.push(token.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Moves all pending comments into `builder`.
    pub fn flush_into<T: Commented>(&mut self, builder: &mut Builder<T>) -> Result<()> {
        for token in self.tokens.drain(..) {
            builder.add_comment(&token)?;
        }
        Ok(())
    }

    /// Moves all pending comments into a plain list.
    pub fn drain_into(&mut self, comments: &mut Vec<String>) {
        comments.extend(self.tokens.drain(..).map(|t| t.value));
    }

    /// Fails if comments are left with nothing to attach to.
    pub fn finish(&mut self) -> Result<()> {
        match self.tokens.first() {
            Some(token) => Err(Error::comment_not_allowed(token)),
            None => Ok(()),
        }
    }
}

/// Routes an entry to the block in `slot` if the keyword belongs to `B`,
/// creating the block and handing it the pending comments on first use.
///
/// Returns `false` when the keyword is not a `B` keyword.
pub fn route<B: Block>(
    slot: &mut Option<Builder<B>>,
    pending: &mut PendingComments,
    token: &Token,
) -> Result<bool> {
    let key = match B::lookup(&token.name) {
        Some(key) => key,
        None => return Ok(false),
    };
    let builder = slot.get_or_insert_with(Builder::default);
    pending.flush_into(builder)?;
    builder.fields().set(key, token)?;
    Ok(true)
}

/// Dispatches the entries of a data section made of keyword blocks.
///
/// In XML every block is an element and only the keywords of the open block
/// are accepted. KVN blocks have no markers: an entry goes to the first block
/// declaring its keyword, and comments wait until that block is known.
#[derive(Debug, Clone)]
pub struct BlockRouter {
    syntax: Syntax,
    pending: PendingComments,
    open: Option<String>,
}

impl BlockRouter {
    pub fn new(syntax: Syntax) -> Self {
        BlockRouter {
            syntax,
            pending: PendingComments::default(),
            open: None,
        }
    }

    pub fn comment(&mut self, token: &Token) {
        self.pending.push(token);
    }

    /// Opens or closes one of the `blocks` elements.
    ///
    /// Returns `false` for any other section token.
    pub fn section(&mut self, token: &Token, blocks: &[&str]) -> Result<bool> {
        if token.is_start() && self.open.is_none() && blocks.contains(&token.name.as_str()) {
            self.open = Some(token.name.clone());
            return Ok(true);
        }
        if token.is_stop() && self.open.as_deref() == Some(token.name.as_str()) {
            self.open = None;
            self.pending.finish()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Routes `token` to `slot` if it is a `B` keyword and, in XML, a `B` element is open.
    pub fn route<B: Block>(&mut self, slot: &mut Option<Builder<B>>, token: &Token) -> Result<bool> {
        if self.syntax == Syntax::Xml && self.open.as_deref() != Some(B::NAME) {
            return Ok(false);
        }
        route(slot, &mut self.pending, token)
    }

    /// Fails on comments left after the last block.
    pub fn finish(&mut self) -> Result<()> {
        self.pending.finish()
    }
}

/// Appends `value` to an indexed list, whose entries must come as 1, 2, 3...
pub fn push_indexed<T>(list: &mut Vec<T>, index: usize, value: T, token: &Token) -> Result<()> {
    let expected = list.len() + 1;
    if index != expected {
        return Err(Error::invalid_index(token, expected, index));
    }
    list.push(value);
    Ok(())
}

/// Fails if a mandatory field is unset.
pub fn mandatory<T>(value: &Option<T>, source: &str, keyword: &str, container: &str) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(Error::missing_keyword(source, keyword, container)),
    }
}

/// Fails if a declared count disagrees with the entries found.
pub fn check_count(source: &str, keyword: &str, declared: Option<usize>, found: usize) -> Result<()> {
    match declared {
        Some(declared) if declared != found => {
            Err(Error::count_mismatch(source, keyword, declared, found))
        }
        _ => Ok(()),
    }
}
