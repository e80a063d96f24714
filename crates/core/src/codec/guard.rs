//! Pre-encode walk that rejects values neither encoding can round-trip.
//!
//! Both encodings write `None` as a null, so `Some(None)`, `Some(())` and a
//! `Some` around a unit struct all read back as `None`. JSON additionally has
//! no form for NaN or the infinities. The walk fails before any bytes are
//! written, so the read-through client skips the write-back and keeps the
//! source rows.

use std::fmt;

use serde::ser::{self, Serialize};

/// Why a value cannot be encoded faithfully
#[derive(Debug)]
pub(crate) struct Rejected(String);

impl Rejected {
    fn within(self, field: &str) -> Self {
        Self(format!("{field}: {}", self.0))
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Rejected {}

impl ser::Error for Rejected {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Walk `value` the way the real encoder will
pub(crate) fn check<T>(value: &T, human_readable: bool) -> Result<(), Rejected>
where
    T: Serialize + ?Sized,
{
    let mut guard =
        Guard { human_readable, finite_floats: human_readable, inside_some: false };
    value.serialize(&mut guard)
}

struct Guard {
    human_readable: bool,
    finite_floats: bool,
    // Set between `Some(` and the first value that is not a null.
    inside_some: bool,
}

impl Guard {
    fn leaf(&mut self) -> Result<(), Rejected> {
        self.inside_some = false;
        Ok(())
    }

    fn null(&mut self, what: &str) -> Result<(), Rejected> {
        if self.inside_some {
            return Err(Rejected(format!("Some({what}) would read back as None")));
        }
        Ok(())
    }

    fn float(&mut self, value: f64) -> Result<(), Rejected> {
        if self.finite_floats && !value.is_finite() {
            return Err(Rejected(format!("{value} has no JSON form")));
        }
        self.leaf()
    }
}

macro_rules! leaves {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _value: $ty) -> Result<(), Rejected> {
                self.leaf()
            }
        )*
    };
}

impl<'a> ser::Serializer for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    leaves! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_f32(self, value: f32) -> Result<(), Rejected> {
        self.float(f64::from(value))
    }

    fn serialize_f64(self, value: f64) -> Result<(), Rejected> {
        self.float(value)
    }

    fn serialize_none(self) -> Result<(), Rejected> {
        self.null("None")
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Rejected> {
        self.inside_some = true;
        value.serialize(&mut *self)?;
        self.leaf()
    }

    fn serialize_unit(self) -> Result<(), Rejected> {
        self.null("()")
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), Rejected> {
        self.null(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), Rejected> {
        self.leaf()
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Rejected> {
        value.serialize(self).map_err(|err| err.within(name))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), Rejected> {
        self.leaf()?;
        value.serialize(self).map_err(|err| err.within(variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Rejected> {
        self.leaf()?;
        Ok(self)
    }

    fn is_human_readable(&self) -> bool {
        self.human_readable
    }
}

impl<'a> ser::SerializeSeq for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Rejected> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeTuple for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Rejected> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeTupleStruct for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Rejected> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeTupleVariant for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Rejected> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeMap for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Rejected> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Rejected> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeStruct for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Rejected> {
        value.serialize(&mut **self).map_err(|err| err.within(key))
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}

impl<'a> ser::SerializeStructVariant for &'a mut Guard {
    type Ok = ();
    type Error = Rejected;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Rejected> {
        value.serialize(&mut **self).map_err(|err| err.within(key))
    }

    fn end(self) -> Result<(), Rejected> {
        Ok(())
    }
}
