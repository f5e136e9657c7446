//! Serde deserializer over binary little endian PLY rows.
//!
//! A row is presented as a map from property name to scalar value, so any
//! `Deserialize` type whose visitor accepts a map can be read straight out of
//! the vertex body.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::de::value::BytesDeserializer;
use serde::de::{DeserializeSeed, MapAccess, Visitor};
use serde::Deserializer;

use crate::ply::header::{ElementDef, PropertyType, ScalarType};
use crate::SpzError;

pub(crate) struct RowDeserializer<'e, R> {
    pub reader: R,
    pub elem_def: &'e ElementDef,
}

impl<'e, R: Read> RowDeserializer<'e, R> {
    pub fn new(reader: R, elem_def: &'e ElementDef) -> Self {
        Self { reader, elem_def }
    }
}

impl<'de, R: Read> Deserializer<'de> for &mut RowDeserializer<'_, R> {
    type Error = SpzError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(RowMap {
            parent: self,
            current_property: 0,
        })
    }

    serde::forward_to_deserialize_any! {
        bool i8 u8 i16 u16 i32 u32 i64 u64 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct RowMap<'a, 'e, R> {
    parent: &'a mut RowDeserializer<'e, R>,
    current_property: usize,
}

impl<'de, R: Read> MapAccess<'de> for RowMap<'_, '_, R> {
    type Error = SpzError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some(prop) = self.parent.elem_def.properties.get(self.current_property) else {
            return Ok(None);
        };
        seed.deserialize(BytesDeserializer::<SpzError>::new(prop.name.as_bytes()))
            .map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let prop = self
            .parent
            .elem_def
            .properties
            .get(self.current_property)
            .ok_or_else(|| SpzError::format("Value requested past the end of a row"))?;
        self.current_property += 1;

        let PropertyType::Scalar(data_type) = prop.property_type else {
            return Err(SpzError::unsupported(format!(
                "List property '{}' in a splat row",
                prop.name
            )));
        };

        seed.deserialize(ScalarDeserializer {
            reader: &mut self.parent.reader,
            data_type,
        })
    }
}

struct ScalarDeserializer<'a, R> {
    reader: &'a mut R,
    data_type: ScalarType,
}

impl<'de, R: Read> Deserializer<'de> for ScalarDeserializer<'_, R> {
    type Error = SpzError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let reader = self.reader;
        match self.data_type {
            ScalarType::I8 => visitor.visit_i8(reader.read_i8()?),
            ScalarType::U8 => visitor.visit_u8(reader.read_u8()?),
            ScalarType::I16 => visitor.visit_i16(reader.read_i16::<LittleEndian>()?),
            ScalarType::U16 => visitor.visit_u16(reader.read_u16::<LittleEndian>()?),
            ScalarType::I32 => visitor.visit_i32(reader.read_i32::<LittleEndian>()?),
            ScalarType::U32 => visitor.visit_u32(reader.read_u32::<LittleEndian>()?),
            ScalarType::F32 => visitor.visit_f32(reader.read_f32::<LittleEndian>()?),
            ScalarType::F64 => visitor.visit_f64(reader.read_f64::<LittleEndian>()?),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // A declared property is present in every row.
        visitor.visit_some(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 u8 i16 u16 i32 u32 f32 f64 i128 i64 u128 u64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}
