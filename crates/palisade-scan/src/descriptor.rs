//! Type extraction from descriptors and generic signatures.
//!
//! Descriptors (`(Ljava/lang/String;I)V`, `[Ljava/util/List;`) have a flat
//! grammar: primitives, array prefixes, and `L<binary-name>;` references.
//! Generic signatures add type variables, wildcards, type arguments, and
//! inner-class suffixes, and need a real recursive-descent parse. Both
//! yield the binary names of every class the text references — the raw
//! material for reference capability requests.

use crate::reader::{ScanError, ScanRes};

/// Every class binary name appearing in a field or method descriptor.
///
/// Descriptors contain no generics, so a linear scan suffices: everything
/// between `L` and `;` is a binary name, and primitives, `[`, and the
/// method parentheses carry no references.
pub fn class_names_in_descriptor(descriptor: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = descriptor.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'L' {
            if let Some(end) = descriptor[i + 1..].find(';') {
                names.push(descriptor[i + 1..i + 1 + end].to_string());
                i += end + 2;
                continue;
            }
            // Unterminated reference: stop rather than fabricate a name.
            break;
        }
        i += 1;
    }
    names
}

/// Every class binary name appearing in a generic signature (class, method,
/// or field form). Inner-class suffixes resolve to their `$` binary names,
/// and each enclosing level is reported as well.
pub(crate) fn class_names_in_signature(signature: &str) -> ScanRes<Vec<String>> {
    let mut parser = SignatureParser {
        bytes: signature.as_bytes(),
        pos: 0,
        names: Vec::new(),
    };
    parser.parse_top_level()?;
    Ok(parser.names)
}

struct SignatureParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    names: Vec<String>,
}

impl SignatureParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> ScanRes<u8> {
        let b = self.peek().ok_or_else(|| self.fail("unexpected end"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> ScanRes<()> {
        let got = self.bump()?;
        if got != expected {
            return Err(self.fail(format!(
                "expected '{}', found '{}'",
                expected as char, got as char
            )));
        }
        Ok(())
    }

    fn fail(&self, reason: impl Into<String>) -> ScanError {
        ScanError::new(format!(
            "malformed signature at offset {}: {}",
            self.pos,
            reason.into()
        ))
    }

    /// An identifier: any run of characters outside the delimiter set.
    fn identifier(&mut self) -> ScanRes<&str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.fail("empty identifier"));
        }
        // Signatures are ASCII-delimited; the slice boundaries are valid.
        std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.fail("identifier is not valid UTF-8"))
    }

    /// ClassSignature, MethodSignature, or FieldTypeSignature.
    fn parse_top_level(&mut self) -> ScanRes<()> {
        if self.peek() == Some(b'<') {
            self.parse_formal_type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            // MethodSignature: parameters, return type, throws clauses.
            self.bump()?;
            while self.peek() != Some(b')') {
                self.parse_type_signature()?;
            }
            self.bump()?; // ')'
            if self.peek() == Some(b'V') {
                self.bump()?;
            } else {
                self.parse_type_signature()?;
            }
            while self.peek() == Some(b'^') {
                self.bump()?;
                self.parse_field_type_signature()?;
            }
        } else {
            // ClassSignature (superclass + interfaces) or a lone
            // FieldTypeSignature: both are a run of type signatures.
            while self.peek().is_some() {
                self.parse_field_type_signature()?;
            }
        }
        if self.peek().is_some() {
            return Err(self.fail("trailing characters"));
        }
        Ok(())
    }

    fn parse_formal_type_parameters(&mut self) -> ScanRes<()> {
        self.expect(b'<')?;
        loop {
            self.identifier()?;
            self.expect(b':')?;
            // Class bound may be empty; interface bounds follow after ':'.
            if !matches!(self.peek(), Some(b':') | Some(b'>')) {
                self.parse_field_type_signature()?;
            }
            while self.peek() == Some(b':') {
                self.bump()?;
                self.parse_field_type_signature()?;
            }
            if self.peek() == Some(b'>') {
                self.bump()?;
                return Ok(());
            }
        }
    }

    /// TypeSignature: a base type or a FieldTypeSignature.
    fn parse_type_signature(&mut self) -> ScanRes<()> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.bump()?;
                Ok(())
            }
            _ => self.parse_field_type_signature(),
        }
    }

    /// FieldTypeSignature: class type, array type, or type variable.
    fn parse_field_type_signature(&mut self) -> ScanRes<()> {
        match self.peek() {
            Some(b'L') => self.parse_class_type_signature(),
            Some(b'[') => {
                self.bump()?;
                self.parse_type_signature()
            }
            Some(b'T') => {
                // Type variable: references no class directly.
                self.bump()?;
                self.identifier()?;
                self.expect(b';')
            }
            Some(other) => Err(self.fail(format!("unexpected '{}'", other as char))),
            None => Err(self.fail("unexpected end")),
        }
    }

    /// ClassTypeSignature: `L` package/name [type-args] (`.` inner
    /// [type-args])* `;` — records the binary name of every nesting level.
    fn parse_class_type_signature(&mut self) -> ScanRes<()> {
        self.expect(b'L')?;
        let mut binary = String::new();
        loop {
            binary.push_str(self.identifier()?);
            if self.peek() == Some(b'/') {
                self.bump()?;
                binary.push('/');
                continue;
            }
            break;
        }
        self.names.push(binary.clone());
        if self.peek() == Some(b'<') {
            self.parse_type_arguments()?;
        }
        while self.peek() == Some(b'.') {
            self.bump()?;
            binary.push('$');
            binary.push_str(self.identifier()?);
            self.names.push(binary.clone());
            if self.peek() == Some(b'<') {
                self.parse_type_arguments()?;
            }
        }
        self.expect(b';')
    }

    fn parse_type_arguments(&mut self) -> ScanRes<()> {
        self.expect(b'<')?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.bump()?;
                }
                Some(b'+') | Some(b'-') => {
                    self.bump()?;
                    self.parse_field_type_signature()?;
                }
                Some(b'>') => {
                    self.bump()?;
                    return Ok(());
                }
                _ => self.parse_field_type_signature()?,
            }
        }
    }
}
