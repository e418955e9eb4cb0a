/* Reference JSON encoder.
 *
 * An independent, direct rendering of the wire contract used as the oracle
 * the generated codec is tested against. It shares no code with the emitted
 * serializers: field order, tag placement, payload hoisting and default
 * elision are all written out a second time here, so a bug in the generator
 * has to be made twice to go unnoticed.
 */

use serde_json::{Map, Value};

use super::values::{PayloadShape, StructValue, TestField, TestValue, UnionValue};

pub fn encode(value: &TestValue<'_>) -> Value {
    match value {
        TestValue::Absent => Value::Null,
        TestValue::Bool(b) => Value::Bool(*b),
        TestValue::Int(i) => Value::from(*i),
        TestValue::UInt(u) => Value::from(*u),
        TestValue::Float(f) => Value::from(*f),
        TestValue::Str(s) | TestValue::Timestamp(s) => Value::String(s.clone()),
        TestValue::Bytes(bytes) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
        TestValue::List(inner) => Value::Array(vec![encode(inner)]),
        TestValue::Map { key, value } => {
            let mut map = Map::new();
            map.insert(key.clone(), encode(value));
            Value::Object(map)
        }
        TestValue::Struct(s) => Value::Object(encode_struct(s)),
        TestValue::Union(u) => Value::Object(encode_union(u)),
    }
}

fn encode_struct(value: &StructValue<'_>) -> Map<String, Value> {
    let mut map = Map::new();
    for field in &value.fields {
        encode_field(&mut map, field);
    }
    map
}

fn encode_field(map: &mut Map<String, Value>, field: &TestField<'_>) {
    if !field.on_wire || matches!(field.value, TestValue::Absent) {
        return;
    }
    if let Some(default) = field.default {
        if field.value.matches_default(default) {
            return;
        }
    }
    if let Some(name) = field.name {
        map.insert(name.to_string(), encode(&field.value));
    }
}

fn encode_union(value: &UnionValue<'_>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(".tag".to_string(), Value::String(value.tag.to_string()));
    let Some(payload) = &value.payload else {
        return map;
    };
    match value.shape {
        PayloadShape::Void => {}
        PayloadShape::Hoisted => {
            if let TestValue::Struct(s) = &payload.value {
                for field in &s.fields {
                    encode_field(&mut map, field);
                }
            }
        }
        PayloadShape::Keyed => {
            if !matches!(payload.value, TestValue::Absent) {
                map.insert(value.tag.to_string(), encode(&payload.value));
            }
        }
    }
    map
}
