//! Serialization helpers for API views built from BSON documents

use bson::{oid::ObjectId, DateTime};
use serde::{ser::SerializeSeq, Serializer};

/// Serialize an ObjectId as a hex string
pub fn object_id_as_hex<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

/// Serialize a list of ObjectIds as hex strings
pub fn object_ids_as_hex<S: Serializer>(ids: &[ObjectId], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(ids.len()))?;
    for id in ids {
        seq.serialize_element(&id.to_hex())?;
    }
    seq.end()
}

/// Serialize an optional BSON datetime as an RFC 3339 string
pub fn optional_datetime_as_rfc3339<S: Serializer>(
    value: &Option<DateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value.and_then(|dt| dt.try_to_rfc3339_string().ok()) {
        Some(s) => serializer.serialize_some(&s),
        None => serializer.serialize_none(),
    }
}

/// Serialize an optional ObjectId as a hex string
pub fn optional_object_id_as_hex<S: Serializer>(
    value: &Option<ObjectId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(id) => serializer.serialize_some(&id.to_hex()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        #[serde(serialize_with = "object_id_as_hex")]
        id: ObjectId,
        #[serde(serialize_with = "object_ids_as_hex")]
        ids: Vec<ObjectId>,
        #[serde(serialize_with = "optional_datetime_as_rfc3339")]
        at: Option<DateTime>,
    }

    #[test]
    fn test_json_rendering() {
        let id = ObjectId::new();
        let sample = Sample {
            id,
            ids: vec![id],
            at: Some(DateTime::from_millis(0)),
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["id"], id.to_hex());
        assert_eq!(value["ids"][0], id.to_hex());
        assert_eq!(value["at"], "1970-01-01T00:00:00Z");
    }
}
