//! Integration tests for the Auditor API

use plumbline::{Auditor, PlumblineError, config::AppConfig, model::EntityName};

const SHOP: &str = r#"
import abc


class Repository(abc.ABC):
    def __init__(self, url):
        self.url = url

    def save(self, item):
        ...

    def load(self, key):
        ...


class OrderRepository(Repository):
    def pending(self):
        return []


class Mailer:
    async def send(self, to, body):
        pass


class OrderService:
    def __init__(self, repo: OrderRepository, mailer: Mailer):
        self.repo = repo
        self.mailer = mailer

    def place(self, order):
        self.repo.save(order)
        self.mailer.send(order.customer, "thanks")
"#;

#[test]
fn test_scaffold_round_trip_is_consistent() {
    let auditor = Auditor::default();
    let code = auditor.source(SHOP);
    assert!(code.diagnostics().is_empty());

    let spec = auditor.scaffold(code.output(), "Shop");
    let diagram = auditor.diagram(&spec);
    assert!(
        diagram.diagnostics().is_empty(),
        "generated specification should interpret cleanly:\n{spec}"
    );

    let report = auditor.audit(&code.output().resolve(), &[diagram.into_output()]);
    assert!(report.is_consistent(), "{report}\n{spec}");
}

const LIBRARY: &str = r#"
class Library:
    def __init__(self, name, address):
        self.name = name
        self.address = address
        self.books = []
        self.members = []

    def add_book(self, book):
        self.books.append(book)
        print(f"Book '{book.title}' added to the library.")

    def register_member(self, member):
        self.members.append(member)
        print(f"Member '{member.name}' registered to the library.")


class Book:
    def __init__(self, title, author, isbn):
        self.title = title
        self.author = author
        self.isbn = isbn
        self.borrower = None

    def borrow(self, member):
        if self.borrower is None:
            self.borrower = member
            print(f"'{self.title}' is borrowed by {member.name}.")
        else:
            print(f"'{self.title}' is already borrowed by {self.borrower.name}.")

    def return_book(self):
        if self.borrower:
            print(f"'{self.title}' is returned by {self.borrower.name}.")
            self.borrower = None
        else:
            print(f"'{self.title}' is not currently borrowed.")


class Member:
    def __init__(self, name, membership_id):
        self.name = name
        self.membership_id = membership_id
        self.borrowed_books = []

    def borrow_book(self, book):
        if len(self.borrowed_books) < 5:
            book.borrow(self)
            self.borrowed_books.append(book)
        else:
            print(f"{self.name} has reached the borrowing limit.")

    def return_book(self, book):
        if book in self.borrowed_books:
            book.return_book()
            self.borrowed_books.remove(book)
        else:
            print(f"{self.name} doesn't have the book '{book.title}' to return.")


class Librarian:
    def __init__(self, name, employee_id):
        self.name = name
        self.employee_id = employee_id

    def catalog_book(self, library, book):
        library.add_book(book)
        print(f"Librarian '{self.name}' cataloged '{book.title}'.")

    def enroll_member(self, library, member):
        library.register_member(member)
        print(f"Librarian '{self.name}' enrolled member '{member.name}'.")
"#;

#[test]
fn test_library_round_trip_draws_connections() {
    let auditor = Auditor::default();
    let code = auditor
        .source_strict(LIBRARY)
        .expect("library code should parse");
    assert_eq!(code.output().connections().len(), 10);

    let spec = auditor.scaffold(code.output(), "Library");
    assert!(spec.contains("    member >> Edge(label=\"borrow_book()\") >> book\n"));
    assert!(spec.contains(
        "    book >> Edge(label=\"borrow()\") >> [library, member, librarian]\n"
    ));
    assert!(spec.contains("    book >> Edge(label=\"return_book()\") >> book\n"));
    assert!(!spec.contains("    member >> Edge(label=\"return_book()\") >> member\n"));

    let diagram = auditor
        .diagram_strict(&spec)
        .expect("generated specification should parse");
    assert!(diagram.diagnostics().is_empty(), "{spec}");
    let edges: Vec<String> = diagram
        .output()
        .edges()
        .iter()
        .filter(|edge| edge.source() != edge.target())
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        edges,
        vec![
            "Library -[add_book()]-> Book",
            "Library -[register_member()]-> Member",
            "Library -[register_member()]-> Librarian",
            "Book -[borrow()]-> Library",
            "Book -[borrow()]-> Member",
            "Book -[borrow()]-> Librarian",
            "Member -[borrow_book()]-> Book",
            "Member -[return_book()]-> Book",
            "Librarian -[catalog_book()]-> Library",
            "Librarian -[catalog_book()]-> Book",
            "Librarian -[enroll_member()]-> Library",
            "Librarian -[enroll_member()]-> Member",
        ]
    );

    let report = auditor.audit(&code.output().resolve(), &[diagram.into_output()]);
    assert!(report.is_consistent(), "{report}\n{spec}");
}

#[test]
fn test_round_trip_with_custom_vocabulary() {
    let config: AppConfig = toml::from_str(
        r#"
[diagram]
edge_constructor = "Link"
label_keyword = "text"
inheritance_label = "extends"
"#,
    )
    .expect("valid config");
    let auditor = Auditor::new(config);

    let code = auditor.source(SHOP);
    let spec = auditor.scaffold(code.output(), "Shop");
    assert!(spec.contains("Link(text=\"extends\")"));

    let diagram = auditor.diagram(&spec);
    let report = auditor.audit(&code.output().resolve(), &[diagram.into_output()]);
    assert!(report.is_consistent(), "{report}");
}

#[test]
fn test_audit_aggregates_diagrams() {
    let auditor = Auditor::default();
    let code = auditor.source(
        "class Api:\n    def get(self): pass\nclass Db:\n    def query(self): pass\n",
    );

    let front = auditor.diagram(
        "api = Container(\"Api\")\napi >> Edge(label=\"get()\") >> api\n",
    );
    let back = auditor.diagram(
        "db = Database(\"Db\")\ndb >> Edge(label=\"query()\") >> db\n",
    );

    let code_model = code.output().resolve();
    let only_front = auditor.audit(&code_model, &[front.output().clone()]);
    assert_eq!(
        only_front.extra_entities().iter().collect::<Vec<_>>(),
        vec![&EntityName::new("Db")]
    );

    let both = auditor.audit(&code_model, &[front.into_output(), back.into_output()]);
    assert!(both.is_consistent(), "{both}");
}

#[test]
fn test_audit_without_diagrams_reports_every_class() {
    let auditor = Auditor::default();
    let code = auditor.source(SHOP);
    let report = auditor.audit(&code.output().resolve(), &[]);
    assert_eq!(report.extra_entities().len(), 4);
    assert!(report.missing_entities().is_empty());
}

#[test]
fn test_soft_and_strict_parsing() {
    let auditor = Auditor::default();
    let broken = "with Diagram(\"x\":\n    pass\n";

    let soft = auditor.diagram(broken);
    assert!(soft.has_errors());
    assert!(soft.output().is_empty());

    match auditor.diagram_strict(broken) {
        Err(PlumblineError::Parse { err, src }) => {
            assert_eq!(src, broken);
            assert!(!err.diagnostics().is_empty());
        }
        other => panic!("expected a parse error, got {other:?}"),
    }

    assert!(auditor.source_strict("class A:\n    def f(self): pass\n").is_ok());
    assert!(auditor.source_strict("class A:\n  def f(self): pass\n def g(self): pass\n").is_err());
}
