use std::fmt;
use std::io::{BufRead, Write};

use crate::SpzError;

/// PLY body encoding declared on the `format` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl fmt::Display for PlyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlyFormat::Ascii => write!(f, "ascii"),
            PlyFormat::BinaryLittleEndian => write!(f, "binary_little_endian"),
            PlyFormat::BinaryBigEndian => write!(f, "binary_big_endian"),
        }
    }
}

/// PLY scalar data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    pub fn parse(s: &str) -> Result<Self, SpzError> {
        match s {
            "char" | "int8" => Ok(ScalarType::I8),
            "uchar" | "uint8" => Ok(ScalarType::U8),
            "short" | "int16" => Ok(ScalarType::I16),
            "ushort" | "uint16" => Ok(ScalarType::U16),
            "int" | "int32" => Ok(ScalarType::I32),
            "uint" | "uint32" => Ok(ScalarType::U32),
            "float" | "float32" => Ok(ScalarType::F32),
            "double" | "float64" => Ok(ScalarType::F64),
            _ => Err(SpzError::format(format!("Unknown scalar type: {s}"))),
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::I8 => "char",
            ScalarType::U8 => "uchar",
            ScalarType::I16 => "short",
            ScalarType::U16 => "ushort",
            ScalarType::I32 => "int",
            ScalarType::U32 => "uint",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Scalar(ScalarType),
    List {
        count_type: ScalarType,
        data_type: ScalarType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyProperty {
    pub name: String,
    pub property_type: PropertyType,
}

impl PlyProperty {
    pub fn scalar(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Scalar(data_type),
        }
    }
}

/// PLY element definition (e.g., vertex, face)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDef {
    pub name: String,
    pub row_count: usize,
    pub properties: Vec<PlyProperty>,
}

impl ElementDef {
    /// Byte size of one binary row, or `None` when a list property makes it variable.
    pub fn row_size(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p.property_type {
                PropertyType::Scalar(t) => Some(t.size_bytes()),
                PropertyType::List { .. } => None,
            })
            .sum()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub version: String,
    pub elements: Vec<ElementDef>,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
}

impl PlyHeader {
    /// Parse a header, leaving `reader` positioned at the first body byte.
    /// Returns the header and the number of bytes it spanned.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<(Self, usize), SpzError> {
        let mut line = Vec::new();
        let mut bytes_read = 0;

        // Lines are read as bytes so binary data after end_header is never
        // mistaken for invalid text.
        bytes_read += reader.read_until(b'\n', &mut line)?;
        if line.trim_ascii() != b"ply" {
            return Err(SpzError::format("File must start with 'ply'"));
        }

        let mut format = None;
        let mut version = String::new();
        let mut elements = Vec::new();
        let mut comments = Vec::new();
        let mut obj_info = Vec::new();
        let mut current_element: Option<ElementDef> = None;

        loop {
            line.clear();
            let line_bytes = reader.read_until(b'\n', &mut line)?;
            if line_bytes == 0 {
                return Err(SpzError::format("Unexpected end of file in header"));
            }
            bytes_read += line_bytes;

            let text = std::str::from_utf8(line.trim_ascii())
                .map_err(|_| SpzError::format("Header is not valid UTF-8"))?;
            if text.is_empty() {
                continue;
            }
            if text == "end_header" {
                break;
            }

            let parts: Vec<&str> = text.split_whitespace().collect();
            match parts[0] {
                "format" => {
                    if parts.len() < 3 {
                        return Err(SpzError::format("Invalid format line"));
                    }
                    format = Some(match parts[1] {
                        "ascii" => PlyFormat::Ascii,
                        "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                        "binary_big_endian" => PlyFormat::BinaryBigEndian,
                        other => {
                            return Err(SpzError::unsupported(format!(
                                "Unknown PLY format: {other}"
                            )))
                        }
                    });
                    version = parts[2].to_string();
                }
                "comment" => comments.push(parts[1..].join(" ")),
                "obj_info" => obj_info.push(parts[1..].join(" ")),
                "element" => {
                    if parts.len() < 3 {
                        return Err(SpzError::format("Invalid element line"));
                    }
                    if let Some(element) = current_element.take() {
                        elements.push(element);
                    }
                    let row_count = parts[2].parse::<usize>().map_err(|_| {
                        SpzError::format(format!("Invalid element count: {}", parts[2]))
                    })?;
                    current_element = Some(ElementDef {
                        name: parts[1].to_string(),
                        row_count,
                        properties: Vec::new(),
                    });
                }
                "property" => {
                    let element = current_element
                        .as_mut()
                        .ok_or_else(|| SpzError::format("Property without element"))?;
                    if parts.len() < 3 {
                        return Err(SpzError::format("Invalid property line"));
                    }

                    if parts[1] == "list" {
                        // property list <count_type> <data_type> <name>
                        if parts.len() < 5 {
                            return Err(SpzError::format("Invalid list property line"));
                        }
                        element.properties.push(PlyProperty {
                            name: parts[4].to_string(),
                            property_type: PropertyType::List {
                                count_type: ScalarType::parse(parts[2])?,
                                data_type: ScalarType::parse(parts[3])?,
                            },
                        });
                    } else {
                        element
                            .properties
                            .push(PlyProperty::scalar(parts[2], ScalarType::parse(parts[1])?));
                    }
                }
                _ => {
                    // Unknown header line, could be an extension.
                    comments.push(text.to_string());
                }
            }
        }

        if let Some(element) = current_element {
            elements.push(element);
        }

        let format = format.ok_or_else(|| SpzError::format("Missing format specification"))?;

        Ok((
            PlyHeader {
                format,
                version,
                elements,
                comments,
                obj_info,
            },
            bytes_read,
        ))
    }

    pub fn get_element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), SpzError> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format {} {}", self.format, self.version)?;
        for comment in &self.comments {
            writeln!(writer, "comment {comment}")?;
        }
        for info in &self.obj_info {
            writeln!(writer, "obj_info {info}")?;
        }
        for element in &self.elements {
            writeln!(writer, "element {} {}", element.name, element.row_count)?;
            for prop in &element.properties {
                match prop.property_type {
                    PropertyType::Scalar(t) => {
                        writeln!(writer, "property {} {}", t.name(), prop.name)?
                    }
                    PropertyType::List {
                        count_type,
                        data_type,
                    } => writeln!(
                        writer,
                        "property list {} {} {}",
                        count_type.name(),
                        data_type.name(),
                        prop.name
                    )?,
                }
            }
        }
        writeln!(writer, "end_header")?;
        Ok(())
    }
}
