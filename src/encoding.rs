//! Persisted form of a [`ConstraintSystem`].
//!
//! All integers are big-endian. The layout is:
//!
//! ```text
//! "BWCS" | version: u16 | modulus: u32 length + bytes
//! backend: u8 | variable count: u64 | one role tag (u8) per variable
//! public inputs, secret inputs: u64 count, then (variable: u64, name)
//! constraints (rank-1 triples or gates + copy constraints)
//! hint bindings: u64 count, then (name, position: u64, inputs, outputs)
//! ```
//!
//! Strings are a `u32` length followed by UTF-8 bytes. Field elements use the
//! fixed width of the modulus.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use ff::PrimeFieldBits;
use log::debug;

use crate::constraint_system::{
    BackendKind, ConstraintSystem, Constraints, CopyConstraint, Gate, Rank1Constraint, Slot,
    WireRef,
};
use crate::error::SerializationError;
use crate::field::FieldContext;
use crate::hint::HintBinding;
use crate::store::VariableRole;
use crate::{LinearCombination, Variable};

const MAGIC: &[u8; 4] = b"BWCS";
const VERSION: u16 = 1;

struct Encoder<'a, Scalar: PrimeFieldBits> {
    field: &'a FieldContext<Scalar>,
    out: Vec<u8>,
}

impl<'a, Scalar: PrimeFieldBits> Encoder<'a, Scalar> {
    fn u8(&mut self, value: u8) {
        self.out.push(value);
    }

    fn u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.out.extend_from_slice(&buf);
    }

    fn u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.out.extend_from_slice(&buf);
    }

    fn u64(&mut self, value: u64) {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, value);
        self.out.extend_from_slice(&buf);
    }

    fn len(&mut self, len: usize) {
        self.u64(len as u64);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.u32(bytes.len() as u32);
        self.out.extend_from_slice(bytes);
    }

    fn var(&mut self, var: Variable) {
        self.u64(var.0 as u64);
    }

    fn slot_var(&mut self, var: Option<Variable>) {
        match var {
            Some(var) => {
                self.u8(1);
                self.var(var);
            }
            None => self.u8(0),
        }
    }

    fn element(&mut self, value: &Scalar) {
        let bytes = self.field.to_bytes(value);
        self.out.extend_from_slice(&bytes);
    }

    fn lc(&mut self, lc: &LinearCombination<Scalar>) {
        self.element(&lc.constant_term());
        self.len(lc.len());
        for (var, coeff) in lc.iter() {
            self.var(var);
            self.element(coeff);
        }
    }

    fn inputs(&mut self, inputs: &[(Variable, String)]) {
        self.len(inputs.len());
        for (var, name) in inputs {
            self.var(*var);
            self.bytes(name.as_bytes());
        }
    }

    fn wire_ref(&mut self, wire: &WireRef) {
        self.len(wire.gate);
        self.u8(wire.slot.tag());
    }
}

struct Decoder<'a, R: Read, Scalar: PrimeFieldBits> {
    field: &'a FieldContext<Scalar>,
    reader: R,
    num_variables: u64,
}

impl<'a, R: Read, Scalar: PrimeFieldBits> Decoder<'a, R, Scalar> {
    fn len(&mut self) -> Result<usize, SerializationError> {
        Ok(self.reader.read_u64::<BigEndian>()? as usize)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, SerializationError> {
        let len = self.reader.read_u32::<BigEndian>()? as usize;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn string(&mut self, what: &'static str) -> Result<String, SerializationError> {
        String::from_utf8(self.bytes()?).map_err(|_| SerializationError::InvalidUtf8(what))
    }

    fn var(&mut self) -> Result<Variable, SerializationError> {
        let index = self.reader.read_u64::<BigEndian>()?;
        if index >= self.num_variables {
            return Err(SerializationError::VariableOutOfRange {
                variable: index,
                count: self.num_variables,
            });
        }
        Ok(Variable(index as usize))
    }

    fn vars(&mut self) -> Result<Vec<Variable>, SerializationError> {
        let count = self.len()?;
        (0..count).map(|_| self.var()).collect()
    }

    fn slot_var(&mut self) -> Result<Option<Variable>, SerializationError> {
        match self.reader.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.var()?)),
            tag => Err(SerializationError::InvalidTag { what: "slot", tag }),
        }
    }

    fn element(&mut self) -> Result<Scalar, SerializationError> {
        let mut buf = vec![0u8; self.field.byte_len()];
        self.reader.read_exact(&mut buf)?;
        self.field
            .from_bytes(&buf)
            .ok_or(SerializationError::InvalidElement)
    }

    fn lc(&mut self) -> Result<LinearCombination<Scalar>, SerializationError> {
        let constant = self.element()?;
        let count = self.len()?;
        let mut terms = Vec::new();
        for _ in 0..count {
            let var = self.var()?;
            terms.push((var.0, self.element()?));
        }
        Ok(LinearCombination::from_parts(terms, constant))
    }

    fn inputs(&mut self) -> Result<Vec<(Variable, String)>, SerializationError> {
        let count = self.len()?;
        let mut inputs = Vec::new();
        for _ in 0..count {
            let var = self.var()?;
            inputs.push((var, self.string("input name")?));
        }
        Ok(inputs)
    }

    /// A constraint index below `count`, or up to `count` when `inclusive`.
    fn constraint_index(
        &mut self,
        what: &'static str,
        count: usize,
        inclusive: bool,
    ) -> Result<usize, SerializationError> {
        let index = self.reader.read_u64::<BigEndian>()?;
        let limit = count as u64 + u64::from(inclusive);
        if index >= limit {
            return Err(SerializationError::ConstraintOutOfRange {
                what,
                index,
                count: count as u64,
            });
        }
        Ok(index as usize)
    }

    fn wire_ref(&mut self, num_gates: usize) -> Result<WireRef, SerializationError> {
        let gate = self.constraint_index("copy constraint", num_gates, false)?;
        let tag = self.reader.read_u8()?;
        let slot = Slot::from_tag(tag).ok_or(SerializationError::InvalidTag { what: "slot", tag })?;
        Ok(WireRef { gate, slot })
    }
}

impl<Scalar: PrimeFieldBits> ConstraintSystem<Scalar> {
    /// The canonical byte encoding of this system.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder {
            field: &self.field,
            out: Vec::new(),
        };

        e.out.extend_from_slice(MAGIC);
        e.u16(VERSION);
        e.bytes(&self.field.modulus().to_bytes_be());
        e.u8(self.backend().tag());

        e.len(self.roles.len());
        for role in &self.roles {
            e.u8(role.tag());
        }
        e.inputs(&self.public);
        e.inputs(&self.secret);

        match &self.constraints {
            Constraints::Rank1(constraints) => {
                e.len(constraints.len());
                for c in constraints {
                    e.lc(&c.l);
                    e.lc(&c.r);
                    e.lc(&c.o);
                }
            }
            Constraints::Gate { gates, copies } => {
                e.len(gates.len());
                for g in gates {
                    for q in [&g.q_l, &g.q_r, &g.q_o, &g.q_m, &g.q_c] {
                        e.element(q);
                    }
                    e.slot_var(g.l);
                    e.slot_var(g.r);
                    e.slot_var(g.o);
                }
                e.len(copies.len());
                for copy in copies {
                    e.wire_ref(&copy.from);
                    e.wire_ref(&copy.to);
                }
            }
        }

        e.len(self.hints.len());
        for hint in &self.hints {
            e.bytes(hint.name.as_bytes());
            e.len(hint.position);
            e.len(hint.inputs.len());
            for var in &hint.inputs {
                e.var(*var);
            }
            e.len(hint.outputs.len());
            for var in &hint.outputs {
                e.var(*var);
            }
        }

        e.out
    }

    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<(), SerializationError> {
        let bytes = self.encode();
        debug!("writing constraint system ({} bytes)", bytes.len());
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Reads a system persisted by [`ConstraintSystem::serialize`]. The
    /// reader must hold nothing past the end of the system.
    pub fn deserialize<R: Read>(mut reader: R) -> Result<Self, SerializationError> {
        let field = FieldContext::<Scalar>::new();

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(SerializationError::BadMagic);
        }
        let version = reader.read_u16::<BigEndian>()?;
        if version != VERSION {
            return Err(SerializationError::UnsupportedVersion(version));
        }

        let mut d = Decoder {
            field: &field,
            reader,
            num_variables: 0,
        };
        if d.bytes()? != field.modulus().to_bytes_be() {
            return Err(SerializationError::FieldMismatch);
        }

        let tag = d.reader.read_u8()?;
        let backend =
            BackendKind::from_tag(tag).ok_or(SerializationError::InvalidTag { what: "backend", tag })?;

        let num_variables = d.len()?;
        let mut roles = Vec::new();
        for _ in 0..num_variables {
            let tag = d.reader.read_u8()?;
            roles.push(
                VariableRole::from_tag(tag).ok_or(SerializationError::InvalidTag { what: "role", tag })?,
            );
        }
        d.num_variables = num_variables as u64;

        let public = d.inputs()?;
        let secret = d.inputs()?;

        let constraints = match backend {
            BackendKind::Rank1 => {
                let count = d.len()?;
                let mut constraints = Vec::new();
                for _ in 0..count {
                    constraints.push(Rank1Constraint {
                        l: d.lc()?,
                        r: d.lc()?,
                        o: d.lc()?,
                    });
                }
                Constraints::Rank1(constraints)
            }
            BackendKind::Gate => {
                let count = d.len()?;
                let mut gates = Vec::new();
                for _ in 0..count {
                    gates.push(Gate {
                        q_l: d.element()?,
                        q_r: d.element()?,
                        q_o: d.element()?,
                        q_m: d.element()?,
                        q_c: d.element()?,
                        l: d.slot_var()?,
                        r: d.slot_var()?,
                        o: d.slot_var()?,
                    });
                }
                let count = d.len()?;
                let mut copies = Vec::new();
                for _ in 0..count {
                    copies.push(CopyConstraint {
                        from: d.wire_ref(gates.len())?,
                        to: d.wire_ref(gates.len())?,
                    });
                }
                Constraints::Gate { gates, copies }
            }
        };

        let count = d.len()?;
        let mut hints = Vec::new();
        for _ in 0..count {
            hints.push(HintBinding {
                name: d.string("hint name")?,
                position: d.constraint_index("hint binding", constraints.len(), true)?,
                inputs: d.vars()?,
                outputs: d.vars()?,
            });
        }

        let mut rest = [0u8; 1];
        if d.reader.read(&mut rest)? != 0 {
            return Err(SerializationError::TrailingBytes);
        }

        debug!(
            "read {} system with {} constraints over {} variables",
            backend,
            constraints.len(),
            roles.len()
        );
        Ok(ConstraintSystem {
            field: field.clone(),
            roles,
            public,
            secret,
            constraints,
            hints,
        })
    }
}
