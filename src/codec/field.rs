//! Linked fields: named regions addressing a [`FixedBuffer`].
//!
//! A message is described as a tree of fields. The root covers the first
//! region of the message; every other field is created relative to a parent,
//! either directly *after* the parent's region or *within* it as a child.
//! Fields live in an arena owned by the [`FieldTree`] and refer to each other
//! by [`FieldId`], so there are no back-pointers to keep alive.
//!
//! The tree exists so a message can be built before its sizes are known: a
//! field can be grown or have its content swapped for a value of another size
//! later, and every field that follows it in the buffer moves by the same
//! amount while every field that contains it grows.
//!
//! ```text
//!  root      after root       after remaining length
//! ┌──────┬─────────────────┬─────────────────────────────────┐
//! │ 0x30 │ remaining length│ body                            │
//! └──────┴─────────────────┼──────────┬─────────┬────────────┤
//!                          │ child    │ child   │ child      │
//!                          └──────────┴─────────┴────────────┘
//! ```

use super::buffer::FixedBuffer;
use super::error::Error;
use heapless::Vec;

/// Handle to a field inside a [`FieldTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Root,
    After,
    Within,
}

#[derive(Debug, Clone, Copy)]
struct Field {
    offset: usize,
    len: usize,
    parent: Option<FieldId>,
    relation: Relation,
}

impl Field {
    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Arena of up to `F` fields describing the layout of one buffer.
///
/// Build-mode operations (`append_after`, `init_child`, `append_bytes`,
/// `set_bytes`) insert bytes into the buffer and keep every field consistent.
/// Parse-mode operations (`map_after`, `map_child`) only address bytes that
/// are already present.
#[derive(Debug, Clone)]
pub struct FieldTree<const F: usize> {
    /// Fields in creation order, indexed by `FieldId`.
    fields: Vec<Field, F>,
    /// Fields in buffer order: a field precedes its children, children
    /// precede the fields that come after their container.
    order: Vec<FieldId, F>,
}

impl<const F: usize> FieldTree<F> {
    /// Create an empty tree.
    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Remove all fields.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.order.clear();
    }

    /// Number of fields in the tree.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Start a new tree whose root covers `len` existing bytes at `offset`.
    pub fn init_root<const C: usize>(
        &mut self,
        buf: &FixedBuffer<C>,
        offset: usize,
        len: usize,
    ) -> Result<FieldId, Error> {
        buf.get(offset, len)?;
        self.clear();
        self.insert_at(
            0,
            Field {
                offset,
                len,
                parent: None,
                relation: Relation::Root,
            },
        )
    }

    /// Insert `init` into the buffer directly after `prev` and create a field
    /// covering it. Pass an empty slice to create a field that is grown later.
    pub fn append_after<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        prev: FieldId,
        init: &[u8],
    ) -> Result<FieldId, Error> {
        let at = self.field(prev)?.end();
        let pos = self.subtree_end(prev)?;
        self.ensure_slot()?;
        buf.insert(at, init)?;
        self.shift_from(pos, init.len() as isize)?;
        self.grow_containers(self.container(prev)?, init.len() as isize)?;
        self.insert_at(
            pos,
            Field {
                offset: at,
                len: init.len(),
                parent: Some(prev),
                relation: Relation::After,
            },
        )
    }

    /// Insert `init` at the end of `parent`'s region and create a child field
    /// covering it. The parent and every field containing it grow.
    pub fn init_child<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        parent: FieldId,
        init: &[u8],
    ) -> Result<FieldId, Error> {
        let at = self.field(parent)?.end();
        let pos = self.subtree_end(parent)?;
        self.ensure_slot()?;
        buf.insert(at, init)?;
        self.shift_from(pos, init.len() as isize)?;
        self.grow_containers(Some(parent), init.len() as isize)?;
        self.insert_at(
            pos,
            Field {
                offset: at,
                len: init.len(),
                parent: Some(parent),
                relation: Relation::Within,
            },
        )
    }

    /// Address `len` existing bytes directly after `prev`.
    pub fn map_after<const C: usize>(
        &mut self,
        buf: &FixedBuffer<C>,
        prev: FieldId,
        len: usize,
    ) -> Result<FieldId, Error> {
        let at = self.field(prev)?.end();
        let limit = match self.container(prev)? {
            Some(container) => self.field(container)?.end(),
            None => buf.len(),
        };
        self.map_region(buf, at, len, limit)?;
        let pos = self.subtree_end(prev)?;
        self.insert_at(
            pos,
            Field {
                offset: at,
                len,
                parent: Some(prev),
                relation: Relation::After,
            },
        )
    }

    /// Address `len` existing bytes inside `parent`, directly after the
    /// parent's last child (or at its start if it has none).
    pub fn map_child<const C: usize>(
        &mut self,
        buf: &FixedBuffer<C>,
        parent: FieldId,
        len: usize,
    ) -> Result<FieldId, Error> {
        let outer = *self.field(parent)?;
        let start = self.position(parent)? + 1;
        let pos = self.subtree_end(parent)?;
        let mut at = outer.offset;
        for &id in &self.order[start..pos] {
            if self.container(id)? == Some(parent) {
                at = self.field(id)?.end();
            }
        }
        self.map_region(buf, at, len, outer.end())?;
        self.insert_at(
            pos,
            Field {
                offset: at,
                len,
                parent: Some(parent),
                relation: Relation::Within,
            },
        )
    }

    /// Grow `field` by appending `bytes` at its end.
    pub fn append_bytes<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        field: FieldId,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let at = self.field(field)?.end();
        let pos = self.subtree_end(field)?;
        buf.insert(at, bytes)?;
        self.shift_from(pos, bytes.len() as isize)?;
        self.grow_containers(Some(field), bytes.len() as isize)
    }

    /// Grow `field` by one byte.
    pub fn append_u8<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        field: FieldId,
        value: u8,
    ) -> Result<(), Error> {
        self.append_bytes(buf, field, &[value])
    }

    /// Grow `field` by a big-endian `u16`.
    pub fn append_u16_be<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        field: FieldId,
        value: u16,
    ) -> Result<(), Error> {
        self.append_bytes(buf, field, &value.to_be_bytes())
    }

    /// Replace the content of a leaf field with `bytes`, resizing it in place.
    ///
    /// Fields with children are rejected with [`Error::InvalidField`] since
    /// their children would no longer address meaningful bytes.
    pub fn set_bytes<const C: usize>(
        &mut self,
        buf: &mut FixedBuffer<C>,
        field: FieldId,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let current = *self.field(field)?;
        let pos = self.subtree_end(field)?;
        if pos != self.position(field)? + 1 {
            return Err(Error::InvalidField);
        }
        buf.replace(current.offset, current.len, bytes)?;
        let delta = bytes.len() as isize - current.len as isize;
        self.shift_from(pos, delta)?;
        self.grow_containers(Some(field), delta)
    }

    /// Borrow the bytes covered by `field`.
    pub fn get<'b, const C: usize>(
        &self,
        buf: &'b FixedBuffer<C>,
        field: FieldId,
    ) -> Result<&'b [u8], Error> {
        let f = self.field(field)?;
        buf.get(f.offset, f.len)
    }

    /// Byte offset of `field` in the buffer.
    pub fn offset(&self, field: FieldId) -> Result<usize, Error> {
        Ok(self.field(field)?.offset)
    }

    /// Length of `field` in bytes.
    pub fn len(&self, field: FieldId) -> Result<usize, Error> {
        Ok(self.field(field)?.len)
    }

    /// One past the last byte covered by any field.
    pub fn extent(&self) -> usize {
        self.fields.iter().map(Field::end).max().unwrap_or(0)
    }

    fn field(&self, id: FieldId) -> Result<&Field, Error> {
        self.fields.get(id.0).ok_or(Error::InvalidField)
    }

    fn field_mut(&mut self, id: FieldId) -> Result<&mut Field, Error> {
        self.fields.get_mut(id.0).ok_or(Error::InvalidField)
    }

    fn ensure_slot(&self) -> Result<(), Error> {
        if self.fields.is_full() {
            Err(Error::TooManyFields)
        } else {
            Ok(())
        }
    }

    fn insert_at(&mut self, pos: usize, field: Field) -> Result<FieldId, Error> {
        let id = FieldId(self.fields.len());
        self.fields.push(field).map_err(|_| Error::TooManyFields)?;
        self.order.push(id).map_err(|_| Error::TooManyFields)?;
        self.order[pos..].rotate_right(1);
        Ok(id)
    }

    fn map_region<const C: usize>(
        &self,
        buf: &FixedBuffer<C>,
        at: usize,
        len: usize,
        limit: usize,
    ) -> Result<(), Error> {
        let end = at.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > limit {
            return Err(Error::OutOfBounds);
        }
        buf.get(at, len)?;
        self.ensure_slot()
    }

    /// The field whose region contains `id`, if any.
    fn container(&self, id: FieldId) -> Result<Option<FieldId>, Error> {
        let mut current = *self.field(id)?;
        loop {
            match (current.relation, current.parent) {
                (Relation::Within, parent) => return Ok(parent),
                (Relation::After, Some(parent)) => current = *self.field(parent)?,
                _ => return Ok(None),
            }
        }
    }

    fn contains(&self, outer: FieldId, inner: FieldId) -> Result<bool, Error> {
        let mut current = self.container(inner)?;
        while let Some(id) = current {
            if id == outer {
                return Ok(true);
            }
            current = self.container(id)?;
        }
        Ok(false)
    }

    fn position(&self, id: FieldId) -> Result<usize, Error> {
        self.order
            .iter()
            .position(|&f| f == id)
            .ok_or(Error::InvalidField)
    }

    /// Index in `order` just past `id` and everything contained in it.
    fn subtree_end(&self, id: FieldId) -> Result<usize, Error> {
        let mut pos = self.position(id)? + 1;
        while pos < self.order.len() && self.contains(id, self.order[pos])? {
            pos += 1;
        }
        Ok(pos)
    }

    fn shift_from(&mut self, pos: usize, delta: isize) -> Result<(), Error> {
        for i in pos..self.order.len() {
            let id = self.order[i];
            let field = self.field_mut(id)?;
            field.offset = field
                .offset
                .checked_add_signed(delta)
                .ok_or(Error::InvalidField)?;
        }
        Ok(())
    }

    fn grow_containers(&mut self, start: Option<FieldId>, delta: isize) -> Result<(), Error> {
        let mut current = start;
        while let Some(id) = current {
            let field = self.field_mut(id)?;
            field.len = field
                .len
                .checked_add_signed(delta)
                .ok_or(Error::InvalidField)?;
            current = self.container(id)?;
        }
        Ok(())
    }
}

impl<const F: usize> Default for FieldTree<F> {
    fn default() -> Self {
        Self::new()
    }
}
