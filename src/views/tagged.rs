//! # Tagged Dispatch
//!
//! A [`TagRegistry`] maps a discriminant value to a concrete fixed record so a
//! buffer whose shape is only known after reading its tag can be decoded
//! without trying each candidate.
//!
//! ## Discriminant
//!
//! Every registered record carries the same discriminant field: same offset,
//! same primitive kind, same name. The field's literal default is the tag,
//! so encoding a record without an explicit tag still writes the right one.
//!
//! ```text
//! tag 0: {kind: uint8 = 0, x: float32}
//! tag 1: {kind: uint8 = 1, name: string[8]}
//!
//! decode: read uint8 at offset 0 ──> tag ──> ObjectType ──> ObjectView
//! ```
//!
//! ## Errors
//!
//! Registration rejects inconsistent records with
//! `ViewError::InvalidTagDefinition`. Decoding or encoding a tag nobody
//! registered raises `ViewError::UnknownTag`.

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use tracing::debug;

use crate::error::ViewError;
use crate::layout::{FieldLayout, NumericKind, ObjectType, PrimitiveType, ViewType};
use crate::schema::{Schema, SchemaCompiler};
use crate::types::Value;
use crate::views::ObjectView;

/// Where the tag lives inside every registered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discriminant {
    pub offset: usize,
    pub ty: PrimitiveType,
}

impl Default for Discriminant {
    fn default() -> Self {
        Self {
            offset: 0,
            ty: PrimitiveType::little(NumericKind::Uint8),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    discriminant: Discriminant,
    tag_field: Option<String>,
    types: HashMap<i64, ObjectType>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discriminant(discriminant: Discriminant) -> Self {
        Self {
            discriminant,
            ..Self::default()
        }
    }

    pub fn discriminant(&self) -> Discriminant {
        self.discriminant
    }

    /// Name of the discriminant field, once a record has been registered.
    pub fn tag_field(&self) -> Option<&str> {
        self.tag_field.as_deref()
    }

    pub fn get(&self, tag: i64) -> Option<&ObjectType> {
        self.types.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Compiles a fixed record and registers it under the tag its
    /// discriminant field declares as default.
    pub fn register_schema(
        &mut self,
        compiler: &mut SchemaCompiler,
        schema: &Schema,
    ) -> Result<i64> {
        let ty = compiler.compile_object(schema)?;
        let tag = self.declared_tag(&ty, None)?;
        self.register(tag, ty)?;
        Ok(tag)
    }

    /// Registers a compiled record under `tag` after checking that its
    /// discriminant field agrees.
    pub fn register(&mut self, tag: i64, ty: ObjectType) -> Result<()> {
        let ty = ty.resolve()?.into_owned();
        let declared = self.declared_tag(&ty, Some(tag))?;
        if declared != tag {
            return Err(ViewError::invalid_tag(
                Some(tag),
                format!("record '{}' declares tag {}", ty.id(), declared),
            )
            .into());
        }
        if let Some(existing) = self.types.get(&tag) {
            return Err(ViewError::invalid_tag(
                Some(tag),
                format!("already registered to record '{}'", existing.id()),
            )
            .into());
        }
        let field = self.discriminant_field(&ty, Some(tag))?;
        let expected = self.tag_field.get_or_insert_with(|| field.name.clone());
        if *expected != field.name {
            return Err(ViewError::invalid_tag(
                Some(tag),
                format!(
                    "discriminant field is named '{}' but earlier records use '{}'",
                    field.name, expected
                ),
            )
            .into());
        }
        debug!(tag, id = ty.id(), "registered tagged record");
        self.types.insert(tag, ty);
        Ok(())
    }

    fn discriminant_field<'t>(
        &self,
        ty: &'t ObjectType,
        tag: Option<i64>,
    ) -> Result<&'t FieldLayout> {
        let layout = ty.layout()?;
        let field = layout
            .fields
            .iter()
            .find(|f| f.start == self.discriminant.offset)
            .ok_or_else(|| {
                ViewError::invalid_tag(
                    tag,
                    format!(
                        "record '{}' has no field at discriminant offset {}",
                        ty.id(),
                        self.discriminant.offset
                    ),
                )
            })?;
        match &field.ty {
            ViewType::Primitive(p) if *p == self.discriminant.ty => Ok(field),
            other => Err(ViewError::invalid_tag(
                tag,
                format!(
                    "field '{}' of record '{}' is {} but the discriminant is {}",
                    field.name,
                    ty.id(),
                    describe(other),
                    describe(&ViewType::Primitive(self.discriminant.ty))
                ),
            )
            .into()),
        }
    }

    /// The tag written into `ty`'s default image by its discriminant default.
    fn declared_tag(&self, ty: &ObjectType, tag: Option<i64>) -> Result<i64> {
        let field = self.discriminant_field(ty, tag)?;
        if field.default.is_none() {
            return Err(ViewError::invalid_tag(
                tag,
                format!(
                    "discriminant field '{}' of record '{}' has no literal default",
                    field.name,
                    ty.id()
                ),
            )
            .into());
        }
        let image = &ty.layout()?.default_image;
        self.discriminant.ty.read_i64(&image[field.range()])
    }

    /// Reads the tag at `offset` and views exactly the matching record.
    pub fn decode<'b>(&self, buffer: &'b [u8], offset: usize) -> Result<ObjectView<&'b [u8]>> {
        ensure!(
            offset <= buffer.len(),
            "record offset {} is past the end of a {} byte buffer",
            offset,
            buffer.len()
        );
        let region = &buffer[offset..];
        let at = self.discriminant.offset;
        ensure!(
            region.len() >= at + self.discriminant.ty.width(),
            "buffer too short to hold a discriminant at offset {}",
            at
        );
        let tag = self.discriminant.ty.read_i64(&region[at..])?;
        let ty = self
            .types
            .get(&tag)
            .ok_or(ViewError::UnknownTag { tag })?;
        let length = ty.length()?;
        ensure!(
            region.len() >= length,
            "record '{}' for tag {} needs {} bytes, got {}",
            ty.id(),
            tag,
            length,
            region.len()
        );
        ObjectView::new(ty.clone(), &region[..length])
    }

    /// Encodes `value` as the record registered for its tag field.
    pub fn encode(&self, value: &Value<'_>) -> Result<ObjectView<Vec<u8>>> {
        let Some(name) = self.tag_field.as_deref() else {
            bail!("no tagged records are registered");
        };
        let tag = match value.field(name) {
            Some(v) if !v.is_null() => v.to_i64_wrapping()?,
            _ => bail!("value has no '{}' tag", name),
        };
        let ty = self
            .types
            .get(&tag)
            .ok_or(ViewError::UnknownTag { tag })?;
        ObjectView::from_value(ty.clone(), value)
    }
}

fn describe(ty: &ViewType) -> String {
    match ty {
        ViewType::Primitive(p) => format!("{} ({:?} endian)", p.kind.name(), p.endian),
        other => other.kind_name().to_string(),
    }
}
