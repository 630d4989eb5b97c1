//! Binary model format.
//!
//! Sections in file order: open class (delta coded), forbid rules, tag array,
//! tag index, enforce rules, prefer rules, constants, ambiguity classes, `N`,
//! `M`, dense `A`, emission entries, pattern blob, and an optional discard
//! list. Integers use the variable-length multibyte code, strings are a
//! length followed by one code point per integer, doubles are 8 bytes little
//! endian.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::error::{Error, Result};

use super::{
    collection::Collection,
    data::{AmbiguityClass, EnforceRule, ForbidRule, Tag},
    model::TaggerData,
};

/// Third label of a two-label forbid rule on disk.
const NO_TAG: u64 = 999;

const MULTIBYTE_LIMIT: u64 = 0x4000_0000;

/// Upper bound on the `A` capacity reserved before any cell has been read.
const PREALLOCATED_CELLS: usize = 1 << 20;

fn corrupt(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::CorruptModel("unexpected end of model data".to_string())
    } else {
        Error::Io(err)
    }
}

pub(crate) fn write_multibyte<W: Write>(wtr: &mut W, value: u64) -> Result<()> {
    if value < 0x40 {
        wtr.write_all(&[value as u8])?;
    } else if value < 0x4000 {
        wtr.write_all(&[0x40 | (value >> 8) as u8, value as u8])?;
    } else if value < 0x40_0000 {
        wtr.write_all(&[0x80 | (value >> 16) as u8, (value >> 8) as u8, value as u8])?;
    } else if value < MULTIBYTE_LIMIT {
        wtr.write_all(&[0xC0 | (value >> 24) as u8, (value >> 16) as u8, (value >> 8) as u8, value as u8])?;
    } else {
        return Err(Error::ValueOutOfRange(value));
    }
    Ok(())
}

fn read_byte<R: Read>(rdr: &mut R) -> Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match rdr.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(corrupt(e)),
        }
    }
}

fn read_multibyte_after<R: Read>(rdr: &mut R, first: u8) -> Result<u64> {
    let up = first >> 6;
    let mut value = u64::from(first & 0x3F);
    for _ in 0..up {
        let mut buf = [0u8; 1];
        rdr.read_exact(&mut buf).map_err(corrupt)?;
        value = (value << 8) | u64::from(buf[0]);
    }
    Ok(value)
}

pub(crate) fn read_multibyte<R: Read>(rdr: &mut R) -> Result<u64> {
    match read_byte(rdr)? {
        Some(first) => read_multibyte_after(rdr, first),
        None => Err(Error::CorruptModel("unexpected end of model data".to_string())),
    }
}

fn read_usize<R: Read>(rdr: &mut R) -> Result<usize> {
    usize::try_from(read_multibyte(rdr)?).map_err(|_| Error::CorruptModel("integer overflow".to_string()))
}

fn write_usize<W: Write>(wtr: &mut W, value: usize) -> Result<()> {
    write_multibyte(wtr, value as u64)
}

pub(crate) fn write_string<W: Write>(wtr: &mut W, s: &str) -> Result<()> {
    write_usize(wtr, s.chars().count())?;
    for c in s.chars() {
        write_multibyte(wtr, u64::from(u32::from(c)))?;
    }
    Ok(())
}

pub(crate) fn read_string<R: Read>(rdr: &mut R) -> Result<String> {
    let len = read_usize(rdr)?;
    let mut s = String::new();
    for _ in 0..len {
        let code = read_multibyte(rdr)?;
        let c = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::CorruptModel(format!("invalid character code {code}")))?;
        s.push(c);
    }
    Ok(s)
}

pub(crate) fn write_double<W: Write>(wtr: &mut W, value: f64) -> Result<()> {
    wtr.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_double<R: Read>(rdr: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    rdr.read_exact(&mut buf).map_err(corrupt)?;
    Ok(f64::from_le_bytes(buf))
}

fn check_tag(tag: Tag, n: usize, what: &str) -> Result<Tag> {
    if tag < n {
        Ok(tag)
    } else {
        Err(Error::CorruptModel(format!("{what}: tag {tag} out of range (N = {n})")))
    }
}

impl TaggerData {
    /// Reads a model written by [`TaggerData::write`].
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let rdr = &mut rdr;
        let mut td = TaggerData::new();

        let mut open_class = AmbiguityClass::new();
        let mut val = 0;
        for _ in 0..read_usize(rdr)? {
            val += read_usize(rdr)?;
            open_class.insert(val);
        }

        let mut forbid_rules = Vec::new();
        for _ in 0..read_usize(rdr)? {
            let tagi = read_usize(rdr)?;
            let tagj = read_usize(rdr)?;
            let tagk = read_multibyte(rdr)?;
            let tagk = if tagk == NO_TAG { None } else { Some(tagk as usize) };
            forbid_rules.push(ForbidRule { tagi, tagj, tagk });
        }

        let mut names = Vec::new();
        for _ in 0..read_usize(rdr)? {
            names.push(read_string(rdr)?);
        }
        for name in &names {
            td.add_tag(name);
        }
        if td.num_tags() != names.len() {
            return Err(Error::CorruptModel("duplicate tag names".to_string()));
        }
        for _ in 0..read_usize(rdr)? {
            let name = read_string(rdr)?;
            let id = read_usize(rdr)?;
            if td.tag_id(&name) != Some(id) {
                return Err(Error::CorruptModel(format!("tag index entry {name} -> {id} disagrees with the tag array")));
            }
        }

        let mut enforce_rules = Vec::new();
        for _ in 0..read_usize(rdr)? {
            let tagi = read_usize(rdr)?;
            let tagsj = (0..read_usize(rdr)?).map(|_| read_usize(rdr)).collect::<Result<Vec<_>>>()?;
            let tagsk = (0..read_usize(rdr)?).map(|_| read_usize(rdr)).collect::<Result<Vec<_>>>()?;
            enforce_rules.push(EnforceRule { tagi, tagsj, tagsk });
        }

        let prefer_rules = (0..read_usize(rdr)?).map(|_| read_string(rdr)).collect::<Result<Vec<_>>>()?;

        let mut constants = BTreeMap::new();
        for _ in 0..read_usize(rdr)? {
            let name = read_string(rdr)?;
            let value = u32::try_from(read_multibyte(rdr)?)
                .map_err(|_| Error::CorruptModel(format!("constant {name} out of range")))?;
            constants.insert(name, value);
        }

        let mut output = Collection::new();
        for _ in 0..read_usize(rdr)? {
            let class = (0..read_usize(rdr)?).map(|_| read_usize(rdr)).collect::<Result<AmbiguityClass>>()?;
            let expected = output.len();
            if output.class_id_of(&class) != expected {
                return Err(Error::CorruptModel("duplicate ambiguity class".to_string()));
            }
        }

        let n = read_usize(rdr)?;
        let m = read_usize(rdr)?;
        if n != td.num_tags() || m != output.len() {
            return Err(Error::CorruptModel(format!(
                "tensor dimensions N = {n}, M = {m} disagree with {} tags and {} ambiguity classes",
                td.num_tags(),
                output.len()
            )));
        }
        for &t in &open_class {
            check_tag(t, n, "open class")?;
        }
        for rule in &forbid_rules {
            check_tag(rule.tagi, n, "forbid rule")?;
            check_tag(rule.tagj, n, "forbid rule")?;
            if let Some(k) = rule.tagk {
                check_tag(k, n, "forbid rule")?;
            }
        }
        for rule in &enforce_rules {
            check_tag(rule.tagi, n, "enforce rule")?;
            for &t in rule.tagsj.iter().chain(rule.tagsk.iter()) {
                check_tag(t, n, "enforce rule")?;
            }
        }
        for (_, class) in output.iter() {
            for &t in class {
                check_tag(t, n, "ambiguity class")?;
            }
        }

        // grows with the data actually present, so a lying header fails on EOF
        let cells = n
            .checked_mul(n)
            .and_then(|nn| nn.checked_mul(n))
            .ok_or_else(|| Error::CorruptModel(format!("transition tensor for {n} states overflows")))?;
        let mut a = Vec::with_capacity(cells.min(PREALLOCATED_CELLS));
        for _ in 0..cells {
            a.push(read_double(rdr)?);
        }
        td.install_a(n, m, a);

        for _ in 0..read_usize(rdr)? {
            let j = check_tag(read_usize(rdr)?, n, "emission")?;
            let i = check_tag(read_usize(rdr)?, n, "emission")?;
            let k = read_usize(rdr)?;
            if k >= m {
                return Err(Error::CorruptModel(format!("emission class {k} out of range (M = {m})")));
            }
            td.set_b(j, i, k, read_double(rdr)?);
        }

        let patterns_len = read_usize(rdr)?;
        let mut patterns = Vec::new();
        rdr.by_ref().take(patterns_len as u64).read_to_end(&mut patterns).map_err(corrupt)?;
        if patterns.len() != patterns_len {
            return Err(Error::CorruptModel("truncated pattern data".to_string()));
        }

        // files written before the discard list existed end here
        let mut discard = Vec::new();
        if let Some(first) = read_byte(rdr)? {
            let limit = read_multibyte_after(rdr, first)?;
            for _ in 0..limit {
                discard.push(read_string(rdr)?);
            }
        }

        td.set_open_class(open_class);
        td.set_forbid_rules(forbid_rules);
        td.set_enforce_rules(enforce_rules);
        td.set_prefer_rules(prefer_rules);
        td.set_constants(constants);
        td.set_output(output);
        td.set_patterns(patterns);
        td.set_discard(discard);
        log::debug!("read model with {n} states and {m} ambiguity classes");
        Ok(td)
    }

    pub fn write<W: Write>(&self, mut wtr: W) -> Result<()> {
        let wtr = &mut wtr;

        // a real third tag equal to the sentinel would read back as a two-label rule
        if self.forbid_rules().iter().any(|rule| rule.tagk.map(|k| k as u64) == Some(NO_TAG)) {
            return Err(Error::ValueOutOfRange(NO_TAG));
        }

        write_usize(wtr, self.open_class().len())?;
        let mut val = 0;
        for &t in self.open_class() {
            write_usize(wtr, t - val)?;
            val = t;
        }

        write_usize(wtr, self.forbid_rules().len())?;
        for rule in self.forbid_rules() {
            write_usize(wtr, rule.tagi)?;
            write_usize(wtr, rule.tagj)?;
            match rule.tagk {
                Some(k) => write_usize(wtr, k)?,
                None => write_multibyte(wtr, NO_TAG)?,
            }
        }

        write_usize(wtr, self.num_tags())?;
        for name in self.tag_names() {
            write_string(wtr, name)?;
        }
        let index: BTreeMap<&str, Tag> = self.tag_names().enumerate().map(|(id, name)| (name, id)).collect();
        write_usize(wtr, index.len())?;
        for (name, id) in index {
            write_string(wtr, name)?;
            write_usize(wtr, id)?;
        }

        write_usize(wtr, self.enforce_rules().len())?;
        for rule in self.enforce_rules() {
            write_usize(wtr, rule.tagi)?;
            write_usize(wtr, rule.tagsj.len())?;
            for &t in &rule.tagsj {
                write_usize(wtr, t)?;
            }
            write_usize(wtr, rule.tagsk.len())?;
            for &t in &rule.tagsk {
                write_usize(wtr, t)?;
            }
        }

        write_usize(wtr, self.prefer_rules().len())?;
        for rule in self.prefer_rules() {
            write_string(wtr, rule)?;
        }

        write_usize(wtr, self.constants().len())?;
        for (name, &value) in self.constants() {
            write_string(wtr, name)?;
            write_multibyte(wtr, u64::from(value))?;
        }

        write_usize(wtr, self.output().len())?;
        for (_, class) in self.output().iter() {
            write_usize(wtr, class.len())?;
            for &t in class {
                write_usize(wtr, t)?;
            }
        }

        let (n, m) = (self.n(), self.m());
        write_usize(wtr, n)?;
        write_usize(wtr, m)?;
        for &p in self.a_slice() {
            write_double(wtr, p)?;
        }

        // every structurally possible entry, zeros included
        let mut cells = Vec::new();
        for j in 0..n {
            for (k, class) in self.output().iter() {
                for &i in class {
                    cells.push((j, i, k));
                }
            }
        }
        cells.sort_unstable();
        write_usize(wtr, cells.len())?;
        for (j, i, k) in cells {
            write_usize(wtr, j)?;
            write_usize(wtr, i)?;
            write_usize(wtr, k)?;
            write_double(wtr, self.b(j, i, k))?;
        }

        write_usize(wtr, self.patterns().len())?;
        wtr.write_all(self.patterns())?;

        if !self.discard().is_empty() {
            write_usize(wtr, self.discard().len())?;
            for d in self.discard() {
                write_string(wtr, d)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        Self::read(BufReader::new(f))
    }

    pub fn from_memory(buf: &[u8]) -> Result<Self> {
        Self::read(buf)
    }

    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let f = File::create(path)?;
        self.write(BufWriter::new(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_multibyte(&mut buf, value).unwrap();
        buf
    }

    #[test]
    fn multibyte_widths() {
        assert_eq!(encode(0x3F), vec![0x3F]);
        assert_eq!(encode(0x40), vec![0x40, 0x40]);
        assert_eq!(encode(999), vec![0x43, 0xE7]);
        assert_eq!(encode(0x4000), vec![0x80, 0x40, 0x00]);
        assert_eq!(encode(0x3FFF_FFFF), vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(write_multibyte(&mut Vec::new(), 0x4000_0000), Err(Error::ValueOutOfRange(_))));
    }

    #[test]
    fn multibyte_decodes_what_it_encodes() {
        for value in [0, 1, 63, 64, 300, 16383, 16384, 4_194_303, 4_194_304, 0x3FFF_FFFF] {
            let buf = encode(value);
            assert_eq!(read_multibyte(&mut buf.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn strings_keep_non_ascii() {
        let mut buf = Vec::new();
        write_string(&mut buf, "adj·ñ").unwrap();
        assert_eq!(read_string(&mut buf.as_slice()).unwrap(), "adj·ñ");
    }

    #[test]
    fn truncated_integer_is_corrupt() {
        let buf = [0x80u8, 0x01];
        assert!(matches!(read_multibyte(&mut &buf[..]), Err(Error::CorruptModel(_))));
    }

    #[test]
    fn empty_model_is_corrupt() {
        assert!(matches!(TaggerData::from_memory(b""), Err(Error::CorruptModel(_))));
    }

    #[test]
    fn header_naming_thousands_of_tags_without_tensor_is_corrupt() {
        let mut buf = Vec::new();
        write_usize(&mut buf, 0).unwrap(); // open class
        write_usize(&mut buf, 0).unwrap(); // forbid rules
        write_usize(&mut buf, 3000).unwrap();
        for t in 0..3000 {
            write_string(&mut buf, &format!("T{t}")).unwrap();
        }
        for _ in 0..4 {
            // tag index, enforce, prefer, constants
            write_usize(&mut buf, 0).unwrap();
        }
        write_usize(&mut buf, 1).unwrap();
        write_usize(&mut buf, 1).unwrap();
        write_usize(&mut buf, 0).unwrap();
        write_usize(&mut buf, 3000).unwrap();
        write_usize(&mut buf, 1).unwrap();
        // the file ends where A[0][0][0] should start
        match TaggerData::from_memory(&buf) {
            Err(Error::CorruptModel(..)) => {}
            _ => panic!("test fail"),
        }
    }

    #[test]
    fn forbid_rule_cannot_use_the_sentinel_as_third_tag() {
        let mut td = TaggerData::new();
        td.add_tag("SENT");
        td.set_forbid_rules(vec![ForbidRule { tagi: 0, tagj: 0, tagk: Some(NO_TAG as usize) }]);
        td.allocate(1, 0);
        let mut buf = Vec::new();
        match td.write(&mut buf) {
            Err(Error::ValueOutOfRange(999)) => {}
            _ => panic!("test fail"),
        }
        assert!(buf.is_empty());

        td.set_forbid_rules(vec![ForbidRule { tagi: 0, tagj: 0, tagk: None }]);
        td.write(&mut buf).unwrap();
        assert_eq!(TaggerData::from_memory(&buf).unwrap().forbid_rules()[0].tagk, None);
    }
}
