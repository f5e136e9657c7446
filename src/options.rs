use serde::{Deserialize, Serialize};

use crate::CoordinateSystem;

/// Options for writing a cloud out, to SPZ or PLY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Convention the in-memory cloud is expressed in.
    pub from: CoordinateSystem,
}

/// Options for reading a cloud in, from SPZ or PLY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackOptions {
    /// Convention the caller wants the loaded cloud in.
    pub to: CoordinateSystem,
}

impl PackOptions {
    pub fn from_system(from: CoordinateSystem) -> Self {
        Self { from }
    }
}

impl UnpackOptions {
    pub fn to_system(to: CoordinateSystem) -> Self {
        Self { to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error as ValueError, MapDeserializer, StrDeserializer};
    use serde::de::IntoDeserializer;

    #[test]
    fn test_coordinate_system_deserializes_from_name() {
        let de: StrDeserializer<ValueError> = "RDF".into_deserializer();
        assert_eq!(CoordinateSystem::deserialize(de).unwrap(), CoordinateSystem::RDF);
    }

    #[test]
    fn test_options_fields_default_when_absent() {
        let empty: Vec<(&str, &str)> = vec![];
        let de = MapDeserializer::<_, ValueError>::new(empty.into_iter());
        assert_eq!(UnpackOptions::deserialize(de).unwrap(), UnpackOptions::default());

        let de = MapDeserializer::<_, ValueError>::new(vec![("from", "LUF")].into_iter());
        assert_eq!(
            PackOptions::deserialize(de).unwrap(),
            PackOptions::from_system(CoordinateSystem::LUF)
        );
    }
}
