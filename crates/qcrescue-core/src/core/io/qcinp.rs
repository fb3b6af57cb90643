use crate::core::io::strategy_tag::{self, StrategyTagError};
use crate::core::io::traits::DeckFile;
use crate::core::models::deck::{InputDeck, JobStep, MoleculeSection, Rem};
use crate::core::models::molecule::{Molecule, Site};
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const JOB_SEPARATOR: &str = "@@@";

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: DeckParseErrorKind,
    },
    #[error("Invalid $comment in job {job}: {source}")]
    Strategy {
        job: usize,
        #[source]
        source: StrategyTagError,
    },
    #[error("Job {job} is missing required section: ${section}")]
    MissingSection { job: usize, section: &'static str },
    #[error("Input deck contains no jobs")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DeckParseErrorKind {
    #[error("Section '${0}' is not closed by '$end'")]
    UnterminatedSection(String),
    #[error("Section '${0}' appears more than once in a job")]
    DuplicateSection(String),
    #[error("Unexpected text outside of a section: '{0}'")]
    StrayText(String),
    #[error("Invalid charge/multiplicity line: '{0}'")]
    InvalidChargeLine(String),
    #[error("Invalid atom line: '{0}'")]
    InvalidAtomLine(String),
    #[error("Invalid $rem line: '{0}'")]
    InvalidRemLine(String),
}

/// One numbered line of a section body.
type BodyLine = (usize, String);

#[derive(Default)]
struct JobSections {
    molecule: Option<MoleculeSection>,
    rem: Option<Rem>,
    comment: Option<String>,
    others: BTreeMap<String, String>,
}

impl JobSections {
    fn is_empty(&self) -> bool {
        self.molecule.is_none()
            && self.rem.is_none()
            && self.comment.is_none()
            && self.others.is_empty()
    }

    fn add(&mut self, name: String, header_line: usize, body: Vec<BodyLine>) -> Result<(), DeckError> {
        let duplicate = || DeckError::Parse {
            line: header_line,
            kind: DeckParseErrorKind::DuplicateSection(name.clone()),
        };
        match name.as_str() {
            "molecule" => {
                if self.molecule.is_some() {
                    return Err(duplicate());
                }
                self.molecule = Some(parse_molecule(header_line, &body)?);
            }
            "rem" => {
                if self.rem.is_some() {
                    return Err(duplicate());
                }
                self.rem = Some(parse_rem(&body)?);
            }
            "comment" => {
                if self.comment.is_some() {
                    return Err(duplicate());
                }
                self.comment = Some(join_body(&body));
            }
            _ => {
                if self.others.contains_key(&name) {
                    return Err(duplicate());
                }
                self.others.insert(name, join_body(&body));
            }
        }
        Ok(())
    }

    fn build(self, job: usize) -> Result<JobStep, DeckError> {
        let molecule = self.molecule.ok_or(DeckError::MissingSection {
            job,
            section: "molecule",
        })?;
        let rem = self.rem.ok_or(DeckError::MissingSection {
            job,
            section: "rem",
        })?;
        let comment = match self.comment {
            Some(raw) => strategy_tag::parse_comment(&raw)
                .map_err(|source| DeckError::Strategy { job, source })?,
            None => Default::default(),
        };
        Ok(JobStep {
            molecule,
            rem,
            sections: self.others,
            comment,
        })
    }
}

fn join_body(body: &[BodyLine]) -> String {
    body.iter()
        .map(|(_, line)| line.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_molecule(header_line: usize, body: &[BodyLine]) -> Result<MoleculeSection, DeckError> {
    let mut lines = body.iter().filter(|(_, line)| !line.trim().is_empty());

    let Some((header_num, header)) = lines.next() else {
        return Err(DeckError::Parse {
            line: header_line,
            kind: DeckParseErrorKind::InvalidChargeLine(String::new()),
        });
    };
    let header = header.trim();
    if header.eq_ignore_ascii_case("read") {
        return Ok(MoleculeSection::Read);
    }

    let invalid_header = || DeckError::Parse {
        line: *header_num,
        kind: DeckParseErrorKind::InvalidChargeLine(header.to_string()),
    };
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(invalid_header());
    }
    let charge: i32 = fields[0].parse().map_err(|_| invalid_header())?;
    let spin_multiplicity: u32 = fields[1].parse().map_err(|_| invalid_header())?;

    let mut sites = Vec::new();
    for (line_num, line) in lines {
        let invalid_atom = || DeckError::Parse {
            line: *line_num,
            kind: DeckParseErrorKind::InvalidAtomLine(line.trim().to_string()),
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(invalid_atom());
        }
        let x: f64 = fields[1].parse().map_err(|_| invalid_atom())?;
        let y: f64 = fields[2].parse().map_err(|_| invalid_atom())?;
        let z: f64 = fields[3].parse().map_err(|_| invalid_atom())?;
        sites.push(Site::new(fields[0], Point3::new(x, y, z)));
    }

    Ok(MoleculeSection::Explicit(Molecule::new(
        charge,
        spin_multiplicity,
        sites,
    )))
}

fn parse_rem(body: &[BodyLine]) -> Result<Rem, DeckError> {
    let mut rem = Rem::new();
    for (line_num, line) in body {
        let content = line.split('!').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let (key, value) = match content.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => match content.split_once(char::is_whitespace) {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (content, ""),
            },
        };
        if key.is_empty() || value.is_empty() {
            return Err(DeckError::Parse {
                line: *line_num,
                kind: DeckParseErrorKind::InvalidRemLine(content.to_string()),
            });
        }
        rem.set(key, value);
    }
    Ok(rem)
}

/// Reader and writer for Q-Chem input decks.
///
/// Jobs are separated by a line holding only `@@@`. Within a job, `$molecule` and `$rem` are
/// parsed; `$comment` is split into text and persisted fix strategies; any other section is kept
/// verbatim and written back unchanged.
pub struct QcInputFile;

impl DeckFile for QcInputFile {
    type Error = DeckError;

    fn read_from(reader: &mut impl BufRead) -> Result<InputDeck, Self::Error> {
        let mut jobs = Vec::new();
        let mut current = JobSections::default();
        let mut open: Option<(String, usize, Vec<BodyLine>)> = None;

        for (idx, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = idx + 1;
            let trimmed = line.trim();

            if open.is_some() {
                if trimmed.eq_ignore_ascii_case("$end") {
                    if let Some((name, header_line, body)) = open.take() {
                        current.add(name, header_line, body)?;
                    }
                } else if let Some((_, _, body)) = open.as_mut() {
                    body.push((line_num, line));
                }
                continue;
            }

            if trimmed.is_empty() {
                continue;
            }
            if trimmed == JOB_SEPARATOR {
                let finished = std::mem::take(&mut current);
                jobs.push(finished.build(jobs.len())?);
                continue;
            }
            if let Some(name) = trimmed.strip_prefix('$') {
                open = Some((name.trim().to_ascii_lowercase(), line_num, Vec::new()));
                continue;
            }
            return Err(DeckError::Parse {
                line: line_num,
                kind: DeckParseErrorKind::StrayText(trimmed.to_string()),
            });
        }

        if let Some((name, header_line, _)) = open {
            return Err(DeckError::Parse {
                line: header_line,
                kind: DeckParseErrorKind::UnterminatedSection(name),
            });
        }
        if !current.is_empty() {
            jobs.push(current.build(jobs.len())?);
        }
        if jobs.is_empty() {
            return Err(DeckError::Empty);
        }
        Ok(InputDeck::new(jobs))
    }

    fn write_to(deck: &InputDeck, writer: &mut impl Write) -> Result<(), Self::Error> {
        for (idx, job) in deck.jobs.iter().enumerate() {
            if idx > 0 {
                writeln!(writer, "{}", JOB_SEPARATOR)?;
                writeln!(writer)?;
            }
            write_job(job, idx, writer)?;
        }
        Ok(())
    }
}

fn write_job(job: &JobStep, idx: usize, writer: &mut impl Write) -> Result<(), DeckError> {
    if !job.comment.is_empty() {
        let rendered = strategy_tag::render_comment(&job.comment)
            .map_err(|source| DeckError::Strategy { job: idx, source })?;
        writeln!(writer, "$comment")?;
        writeln!(writer, "{}", rendered)?;
        writeln!(writer, "$end")?;
        writeln!(writer)?;
    }

    writeln!(writer, "$molecule")?;
    match &job.molecule {
        MoleculeSection::Read => writeln!(writer, "read")?,
        MoleculeSection::Explicit(mol) => {
            writeln!(writer, "{} {}", mol.charge, mol.spin_multiplicity)?;
            for site in &mol.sites {
                writeln!(
                    writer,
                    " {:<3}{:>16.8}{:>16.8}{:>16.8}",
                    site.species, site.coords.x, site.coords.y, site.coords.z
                )?;
            }
        }
    }
    writeln!(writer, "$end")?;
    writeln!(writer)?;

    writeln!(writer, "$rem")?;
    for (key, value) in job.rem.iter() {
        writeln!(writer, "   {} = {}", key, value)?;
    }
    writeln!(writer, "$end")?;

    for (name, body) in &job.sections {
        writeln!(writer)?;
        writeln!(writer, "${}", name)?;
        if !body.is_empty() {
            writeln!(writer, "{}", body)?;
        }
        writeln!(writer, "$end")?;
    }
    writeln!(writer)?;
    Ok(())
}
