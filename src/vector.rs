use crate::error::{ImportError, ValueError};

pub const EMBEDDING_SIZE: usize = 1536;
pub const VALUE_SEPARATOR: &str = ", ";

/// Strips one leading `[` and one trailing `]` and splits on `", "`.
pub fn split_vector_tokens(field: &str) -> Vec<&str> {
    let inner = field.strip_prefix('[').unwrap_or(field);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner.split(VALUE_SEPARATOR).collect()
}

/// Parses a `[v1, v2, ..., vN]` literal into `buffer`, which must hold exactly
/// as many values as the vector is expected to carry.
pub fn parse_vector_into(field: &str, buffer: &mut [f32]) -> Result<(), ImportError> {
    let tokens = split_vector_tokens(field);
    if tokens.len() != buffer.len() {
        return Err(ImportError::VectorSizeMismatch {
            expected: buffer.len(),
            observed: tokens.len(),
        });
    }

    for (position, (token, slot)) in tokens.iter().zip(buffer.iter_mut()).enumerate() {
        *slot = parse_value(token, position)?;
    }

    Ok(())
}

pub fn parse_embedding(field: &str) -> Result<Vec<f32>, ImportError> {
    let mut buffer = vec![0_f32; EMBEDDING_SIZE];
    parse_vector_into(field, &mut buffer)?;
    Ok(buffer)
}

/// Parses one token at single precision. Finite literals that overflow f32
/// are rejected; only spelled-out `inf`/`infinity`/`nan` may yield a
/// non-finite value.
pub fn parse_value(token: &str, position: usize) -> Result<f32, ImportError> {
    let invalid = |source: ValueError| ImportError::VectorValueParseError {
        position,
        token: token.to_string(),
        source,
    };

    let value = token
        .parse::<f32>()
        .map_err(|err| invalid(ValueError::from(err)))?;
    if !value.is_finite() && !is_non_finite_literal(token) {
        return Err(invalid(ValueError::OutOfRange));
    }

    Ok(value)
}

fn is_non_finite_literal(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|literal| unsigned.eq_ignore_ascii_case(literal))
}

/// Shortest decimal rendering that parses back to the same f32.
pub fn render_value(value: f32) -> String {
    value.to_string()
}

#[cfg(test)]
pub fn render_vector(values: &[f32]) -> String {
    let tokens = values
        .iter()
        .map(|value| render_value(*value))
        .collect::<Vec<String>>();
    format!("[{}]", tokens.join(VALUE_SEPARATOR))
}

pub fn encode_embedding_blob(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect::<Vec<u8>>()
}

pub fn decode_embedding_blob(blob: &[u8], expected_dim: usize) -> Option<Vec<f32>> {
    if expected_dim == 0 || blob.len() != expected_dim.saturating_mul(4) {
        return None;
    }

    let values = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect::<Vec<f32>>();

    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_literal() -> (Vec<f32>, String) {
        let values = (0..EMBEDDING_SIZE)
            .map(|index| (index as f32 - 768.0) / 1024.0)
            .collect::<Vec<f32>>();
        let literal = render_vector(&values);
        (values, literal)
    }

    #[test]
    fn parse_embedding_reads_full_size_vector_in_order() {
        let (values, literal) = full_literal();

        let parsed = parse_embedding(&literal).expect("full vector should parse");
        assert_eq!(parsed.len(), EMBEDDING_SIZE);
        assert_eq!(parsed, values);
    }

    #[test]
    fn parsed_tokens_render_back_to_the_same_literal() {
        let literal = "[-0.0123, 0.5, 1e-7, 3.25]";
        let mut buffer = [0_f32; 4];
        parse_vector_into(literal, &mut buffer).expect("literal should parse");

        let rendered = buffer
            .iter()
            .map(|value| render_value(*value).parse::<f32>().expect("rendered value parses"))
            .collect::<Vec<f32>>();
        assert_eq!(rendered, buffer.to_vec());
        assert_eq!(render_vector(&buffer[..2]), "[-0.0123, 0.5]");
    }

    #[test]
    fn size_mismatch_reports_observed_count() {
        let (_, literal) = full_literal();
        let short = literal.rsplit_once(VALUE_SEPARATOR).map(|(head, _)| format!("{head}]"));
        let short = short.expect("literal has separators");

        match parse_embedding(&short) {
            Err(ImportError::VectorSizeMismatch { expected, observed }) => {
                assert_eq!(expected, EMBEDDING_SIZE);
                assert_eq!(observed, EMBEDDING_SIZE - 1);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }

        let mut buffer = [0_f32; 3];
        match parse_vector_into("[1, 2, 3, 4]", &mut buffer) {
            Err(ImportError::VectorSizeMismatch { observed, .. }) => assert_eq!(observed, 4),
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn separator_must_be_comma_and_single_space() {
        let mut buffer = [0_f32; 3];
        match parse_vector_into("[1,2,3]", &mut buffer) {
            Err(ImportError::VectorSizeMismatch { observed, .. }) => assert_eq!(observed, 1),
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn invalid_token_reports_position_and_leaves_no_default() {
        let mut buffer = [7_f32; 3];
        match parse_vector_into("[0.1, abc, 0.3]", &mut buffer) {
            Err(ImportError::VectorValueParseError {
                position, token, ..
            }) => {
                assert_eq!(position, 1);
                assert_eq!(token, "abc");
            }
            other => panic!("expected value parse error, got {other:?}"),
        }
        assert_eq!(buffer[1], 7.0);
    }

    #[test]
    fn overflowing_token_is_rejected_instead_of_becoming_infinite() {
        let mut buffer = [0_f32; 4];
        match parse_vector_into("[0.1, 0.2, 1e39, 0.4]", &mut buffer) {
            Err(ImportError::VectorValueParseError {
                position,
                token,
                source: ValueError::OutOfRange,
            }) => {
                assert_eq!(position, 2);
                assert_eq!(token, "1e39");
            }
            other => panic!("expected out of range error, got {other:?}"),
        }

        assert!(matches!(
            parse_value("-1e40", 5),
            Err(ImportError::VectorValueParseError {
                position: 5,
                source: ValueError::OutOfRange,
                ..
            })
        ));
    }

    #[test]
    fn spelled_out_non_finite_values_are_accepted() {
        assert_eq!(parse_value("inf", 0).ok(), Some(f32::INFINITY));
        assert_eq!(parse_value("-Infinity", 0).ok(), Some(f32::NEG_INFINITY));
        assert!(parse_value("NaN", 0).is_ok_and(f32::is_nan));
        assert_eq!(parse_value("3.4028235e38", 0).ok(), Some(f32::MAX));
    }

    #[test]
    fn empty_token_is_a_parse_error() {
        let mut buffer = [0_f32; 2];
        match parse_vector_into("[0.1, ]", &mut buffer) {
            Err(ImportError::VectorValueParseError { position, .. }) => assert_eq!(position, 1),
            other => panic!("expected value parse error, got {other:?}"),
        }
    }

    #[test]
    fn only_outer_brackets_are_stripped() {
        let tokens = split_vector_tokens("[[1, 2]]");
        assert_eq!(tokens, vec!["[1", "2]"]);

        let tokens = split_vector_tokens("1, 2");
        assert_eq!(tokens, vec!["1", "2"]);
    }

    #[test]
    fn embedding_blob_encodes_little_endian_values() {
        let values = vec![1.5_f32, -0.25, 0.0];
        let blob = encode_embedding_blob(&values);
        assert_eq!(blob.len(), 12);
        assert_eq!(&blob[..4], &1.5_f32.to_le_bytes());

        assert_eq!(decode_embedding_blob(&blob, 3), Some(values));
        assert_eq!(decode_embedding_blob(&blob, 4), None);
        assert_eq!(decode_embedding_blob(&[], 0), None);
    }
}
