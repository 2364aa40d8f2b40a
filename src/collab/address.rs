use std::fmt;

/// Resolved collaboration room address.
///
/// The routing layer parses the connection's resource exactly once into this
/// tagged form; everything downstream (registry, relay, flusher) consumes the
/// variant instead of re-splitting key strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoomAddress {
    /// Legacy single-document mode, keyed by an opaque document id.
    LegacyDocument { document_id: String },
    /// A file inside a project, addressed as `<projectId>:<fileId>`.
    ProjectFile { project_id: String, file_id: String },
    /// The derived file listing room of a project, addressed as `<projectId>-files`.
    FileManifest { project_id: String },
}

/// Reserved suffix that marks a project's file-manifest room.
const MANIFEST_SUFFIX: &str = "-files";

impl RoomAddress {
    /// Parse the trailing resource segment (or `?room=` value) of a collab
    /// connection into a room address.
    ///
    /// Rules:
    /// * a single `<id>:<id>` colon split denotes a project file
    /// * a `-files` suffix denotes the project's file-manifest room
    /// * any other non-empty segment is a bare legacy document id
    pub fn parse(room: &str) -> Result<Self, AddressError> {
        let room = room.trim();
        if room.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some((project, file)) = room.split_once(':') {
            if project.is_empty() || file.is_empty() || file.contains(':') {
                return Err(AddressError::Malformed(room.to_string()));
            }
            return Ok(RoomAddress::ProjectFile {
                project_id: project.to_string(),
                file_id: file.to_string(),
            });
        }

        if let Some(project) = room.strip_suffix(MANIFEST_SUFFIX) {
            if project.is_empty() {
                return Err(AddressError::Malformed(room.to_string()));
            }
            return Ok(RoomAddress::FileManifest {
                project_id: project.to_string(),
            });
        }

        Ok(RoomAddress::LegacyDocument {
            document_id: room.to_string(),
        })
    }

    /// Registry key for this address. Keys are opaque and case-sensitive;
    /// the three namespaces are `<documentId>`, `<documentId>:<fileId>` and
    /// `<projectId>:files`.
    pub fn room_key(&self) -> String {
        match self {
            RoomAddress::LegacyDocument { document_id } => document_id.clone(),
            RoomAddress::ProjectFile { project_id, file_id } => {
                format!("{}:{}", project_id, file_id)
            }
            RoomAddress::FileManifest { project_id } => format!("{}:files", project_id),
        }
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.room_key())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AddressError {
    Empty,
    Malformed(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "Room identifier is missing"),
            AddressError::Malformed(room) => write!(f, "Malformed room identifier '{}'", room),
        }
    }
}

impl std::error::Error for AddressError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_document() {
        assert_eq!(
            RoomAddress::parse("demo-room"),
            Ok(RoomAddress::LegacyDocument {
                document_id: "demo-room".to_string()
            })
        );
    }

    #[test]
    fn parses_project_file() {
        assert_eq!(
            RoomAddress::parse("proj1:file7"),
            Ok(RoomAddress::ProjectFile {
                project_id: "proj1".to_string(),
                file_id: "file7".to_string()
            })
        );
    }

    #[test]
    fn parses_file_manifest() {
        assert_eq!(
            RoomAddress::parse("proj1-files"),
            Ok(RoomAddress::FileManifest {
                project_id: "proj1".to_string()
            })
        );
    }

    #[test]
    fn keys_are_distinct_across_namespaces() {
        let legacy = RoomAddress::parse("proj1").unwrap();
        let file = RoomAddress::parse("proj1:file7").unwrap();
        let manifest = RoomAddress::parse("proj1-files").unwrap();
        assert_ne!(legacy.room_key(), file.room_key());
        assert_ne!(legacy.room_key(), manifest.room_key());
        assert_ne!(file.room_key(), manifest.room_key());
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert_eq!(RoomAddress::parse(""), Err(AddressError::Empty));
        assert_eq!(RoomAddress::parse("   "), Err(AddressError::Empty));
        assert!(matches!(
            RoomAddress::parse(":file7"),
            Err(AddressError::Malformed(_))
        ));
        assert!(matches!(
            RoomAddress::parse("proj1:"),
            Err(AddressError::Malformed(_))
        ));
        assert!(matches!(
            RoomAddress::parse("a:b:c"),
            Err(AddressError::Malformed(_))
        ));
        assert!(matches!(
            RoomAddress::parse("-files"),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn case_sensitive_keys() {
        let a = RoomAddress::parse("Room").unwrap();
        let b = RoomAddress::parse("room").unwrap();
        assert_ne!(a.room_key(), b.room_key());
    }
}
