//! Interactive menu shell
//!
//! Reads whitespace-separated tokens (one name per token, like `scanf("%s")`)
//! and drives a [`RecordStore`]. Tokens are raw bytes, so names in any
//! 8-bit encoding pass through unchanged. Store failures are printed and the menu
//! continues; only console I/O errors end the session early.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tracing::{debug, error};

use repertoire_engine::{ClientRecord, RecordKey, RecordStore};

/// Menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Exit = 0,
    Add = 1,
    ShowAll = 2,
    Search = 3,
    ChangeNumber = 4,
    SortByName = 5,
    SortedSearch = 6,
}

impl MenuChoice {
    pub fn from_raw(choice: i64) -> Option<Self> {
        match choice {
            0 => Some(MenuChoice::Exit),
            1 => Some(MenuChoice::Add),
            2 => Some(MenuChoice::ShowAll),
            3 => Some(MenuChoice::Search),
            4 => Some(MenuChoice::ChangeNumber),
            5 => Some(MenuChoice::SortByName),
            6 => Some(MenuChoice::SortedSearch),
            _ => None,
        }
    }
}

const MENU: &str = "\nMenu:\n\
1. Add a client\n\
2. Show all clients\n\
3. Search for a client\n\
4. Change a client's number\n\
5. Sort clients by name\n\
6. Search for a client (sorted file)\n\
0. Exit\n\
Enter your choice: ";

/// Whitespace-separated tokens from a line-oriented reader
struct Tokens<R> {
    reader: R,
    pending: VecDeque<Vec<u8>>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Tokens {
            reader,
            pending: VecDeque::new(),
        }
    }

    /// Next token, `None` at end of input
    fn next_token(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut line = Vec::new();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }
            self.pending.extend(
                line.split(|b| b.is_ascii_whitespace())
                    .filter(|token| !token.is_empty())
                    .map(<[u8]>::to_vec),
            );
        }
    }
}

/// Integer value of a token
fn parse_number(token: &[u8]) -> Option<i64> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

/// Outcome of one menu action
enum Flow {
    Continue,
    Quit,
}

/// Menu loop over a store and a console
pub struct Shell<'s, S: RecordStore + ?Sized, R, W> {
    store: &'s mut S,
    input: Tokens<R>,
    output: W,
}

impl<'s, S, R, W> Shell<'s, S, R, W>
where
    S: RecordStore + ?Sized,
    R: BufRead,
    W: Write,
{
    pub fn new(store: &'s mut S, input: R, output: W) -> Self {
        Shell {
            store,
            input: Tokens::new(input),
            output,
        }
    }

    /// Run until the user exits or input ends
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.prompt(MENU)?;
            let Some(token) = self.input.next_token()? else {
                debug!("End of input, leaving menu");
                writeln!(self.output)?;
                return Ok(());
            };

            let choice = parse_number(&token).and_then(MenuChoice::from_raw);
            let flow = match choice {
                Some(MenuChoice::Exit) => {
                    writeln!(self.output, "Exiting program.")?;
                    Flow::Quit
                }
                Some(MenuChoice::Add) => self.add_client()?,
                Some(MenuChoice::ShowAll) => self.show_all()?,
                Some(MenuChoice::Search) => self.search(false)?,
                Some(MenuChoice::ChangeNumber) => self.change_number()?,
                Some(MenuChoice::SortByName) => self.sort_by_name()?,
                Some(MenuChoice::SortedSearch) => self.search(true)?,
                None => {
                    writeln!(self.output, "Invalid choice. Please try again.")?;
                    Flow::Continue
                }
            };

            if let Flow::Quit = flow {
                return Ok(());
            }
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.output, "{}", text)?;
        self.output.flush()
    }

    /// Prompt and read one token; `None` means input ended
    fn ask(&mut self, text: &str) -> io::Result<Option<Vec<u8>>> {
        self.prompt(text)?;
        self.input.next_token()
    }

    fn ask_phone(&mut self, text: &str) -> io::Result<Option<Option<i64>>> {
        let Some(token) = self.ask(text)? else {
            return Ok(None);
        };
        match parse_number(&token) {
            Some(phone) => Ok(Some(Some(phone))),
            None => {
                writeln!(
                    self.output,
                    "\nInvalid phone number: {}",
                    String::from_utf8_lossy(&token)
                )?;
                Ok(Some(None))
            }
        }
    }

    fn ask_key(&mut self) -> io::Result<Option<RecordKey>> {
        let Some(last) = self.ask("\nEnter the last name of the client to search: ")? else {
            return Ok(None);
        };
        let Some(first) = self.ask("\nEnter the first name of the client to search: ")? else {
            return Ok(None);
        };
        Ok(Some(RecordKey::new(last, first)))
    }

    fn add_client(&mut self) -> io::Result<Flow> {
        let Some(last) = self.ask("\nLast Name: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(first) = self.ask("\nFirst Name: ")? else {
            return Ok(Flow::Quit);
        };
        let phone = match self.ask_phone("\nPhone Number: ")? {
            None => return Ok(Flow::Quit),
            Some(None) => return Ok(Flow::Continue),
            Some(Some(phone)) => phone,
        };

        match self.store.append(&ClientRecord::new(last, first, phone)) {
            Ok(_) => writeln!(self.output, "\nClient added successfully")?,
            Err(e) => {
                error!("Append failed: {}", e);
                writeln!(self.output, "\nError writing to file: {}", e)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn show_all(&mut self) -> io::Result<Flow> {
        let records = match self.store.records() {
            Ok(records) => records,
            Err(e) => {
                error!("Scan failed: {}", e);
                writeln!(self.output, "Error reading file: {}", e)?;
                return Ok(Flow::Continue);
            }
        };

        for item in records {
            match item {
                Ok(stored) => writeln!(self.output, "{}", stored.record)?,
                Err(e) => {
                    error!("Scan failed: {}", e);
                    writeln!(self.output, "Error reading file: {}", e)?;
                    break;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn search(&mut self, sorted: bool) -> io::Result<Flow> {
        let Some(key) = self.ask_key()? else {
            return Ok(Flow::Quit);
        };

        let result = if sorted {
            self.store.bisect_by_key(&key)
        } else {
            self.store.find_by_key(&key)
        };
        match result {
            Ok(Some(stored)) => writeln!(self.output, "{}", stored.record)?,
            Ok(None) => writeln!(self.output, "\nThe searched client was not found in the file")?,
            Err(e) => {
                error!("Search failed: {}", e);
                writeln!(self.output, "\nError reading file: {}", e)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn change_number(&mut self) -> io::Result<Flow> {
        let Some(key) = self.ask_key()? else {
            return Ok(Flow::Quit);
        };

        match self.store.find_by_key(&key) {
            Ok(Some(stored)) => writeln!(self.output, "{}", stored.record)?,
            Ok(None) => {
                writeln!(self.output, "\nThe searched client was not found in the file")?;
                return Ok(Flow::Continue);
            }
            Err(e) => {
                error!("Search failed: {}", e);
                writeln!(self.output, "\nError reading file: {}", e)?;
                return Ok(Flow::Continue);
            }
        }

        let phone = match self.ask_phone("\nEnter the new phone number: ")? {
            None => return Ok(Flow::Quit),
            Some(None) => return Ok(Flow::Continue),
            Some(Some(phone)) => phone,
        };

        match self.store.update_by_key(&key, phone) {
            Ok(Some(stored)) => {
                writeln!(self.output, "Phone number updated successfully")?;
                writeln!(self.output, "New details - {}", stored.record)?;
            }
            Ok(None) => writeln!(self.output, "\nThe searched client was not found in the file")?,
            Err(e) => {
                error!("Update failed: {}", e);
                writeln!(self.output, "Error updating phone number: {}", e)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn sort_by_name(&mut self) -> io::Result<Flow> {
        match self.store.sort_by_name() {
            Ok(moved) => writeln!(self.output, "Clients sorted by name ({} moved)", moved)?,
            Err(e) => {
                error!("Sort failed: {}", e);
                writeln!(self.output, "Error sorting file: {}", e)?;
            }
        }
        Ok(Flow::Continue)
    }
}
