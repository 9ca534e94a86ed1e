//! GraphQL surface of the catalog.
//!
//! The executable schema is assembled at startup from explicit resolver
//! functions, one per query or mutation field.

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Schema,
    SchemaError, TypeRef,
};
use async_graphql::Value;
use axum::{extract::State, Json};

use super::models::{Book, BookInput};
use super::service::BookService;

const BOOK: &str = "Book";
const BOOK_INPUT: &str = "BookInput";

/// Build the executable catalog schema with `service` as resolver data.
pub fn build_schema(service: BookService) -> Result<Schema, SchemaError> {
    let book = Object::new(BOOK)
        .description("A book in the library")
        .field(book_field("id", TypeRef::named_nn(TypeRef::ID), |book| {
            Value::from(book.id.clone())
        }))
        .field(book_field("title", TypeRef::named_nn(TypeRef::STRING), |book| {
            Value::from(book.title.clone())
        }))
        .field(book_field("author", TypeRef::named_nn(TypeRef::STRING), |book| {
            Value::from(book.author.clone())
        }))
        .field(book_field("year", TypeRef::named_nn(TypeRef::INT), |book| {
            Value::from(book.year)
        }));

    let book_input = InputObject::new(BOOK_INPUT)
        .field(InputValue::new("title", TypeRef::named_nn(TypeRef::STRING)))
        .field(InputValue::new("author", TypeRef::named_nn(TypeRef::STRING)))
        .field(InputValue::new("year", TypeRef::named_nn(TypeRef::INT)));

    let query = Object::new("Query")
        .field(
            Field::new("allBooks", TypeRef::named_nn_list_nn(BOOK), all_books)
                .description("Get all books in the library"),
        )
        .field(
            Field::new("book", TypeRef::named(BOOK), book_by_id)
                .description("Get a book by its ID")
                .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
        )
        .field(
            Field::new("booksByAuthor", TypeRef::named_nn_list_nn(BOOK), books_by_author)
                .description("Find books by author name")
                .argument(InputValue::new("author", TypeRef::named_nn(TypeRef::STRING))),
        );

    let mutation = Object::new("Mutation")
        .field(
            Field::new("addBook", TypeRef::named_nn(BOOK), add_book)
                .description("Add a new book to the library")
                .argument(InputValue::new("input", TypeRef::named_nn(BOOK_INPUT))),
        )
        .field(
            Field::new("updateBook", TypeRef::named_nn(BOOK), update_book)
                .description("Update an existing book")
                .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
                .argument(InputValue::new("input", TypeRef::named_nn(BOOK_INPUT))),
        )
        .field(
            Field::new("deleteBook", TypeRef::named_nn(TypeRef::BOOLEAN), delete_book)
                .description("Delete a book by ID")
                .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
        );

    Schema::build(query.type_name(), Some(mutation.type_name()), None)
        .register(book)
        .register(book_input)
        .register(query)
        .register(mutation)
        .data(service)
        .finish()
}

fn book_field(name: &'static str, ty: TypeRef, get: fn(&Book) -> Value) -> Field {
    Field::new(name, ty, move |ctx| {
        FieldFuture::new(async move {
            let book = ctx.parent_value.try_downcast_ref::<Book>()?;
            Ok(Some(get(book)))
        })
    })
}

fn all_books(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let books = ctx.data::<BookService>()?.all_books().await?;
        Ok(Some(FieldValue::list(books.into_iter().map(FieldValue::owned_any))))
    })
}

fn book_by_id(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let id = id_argument(&ctx)?;
        let book = ctx.data::<BookService>()?.book(&id).await?;
        Ok(book.map(FieldValue::owned_any))
    })
}

fn books_by_author(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let author = ctx.args.try_get("author")?.string()?.to_string();
        let books = ctx.data::<BookService>()?.books_by_author(&author).await?;
        Ok(Some(FieldValue::list(books.into_iter().map(FieldValue::owned_any))))
    })
}

fn add_book(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let input = book_input(&ctx)?;
        let book = ctx.data::<BookService>()?.add_book(input).await?;
        Ok(Some(FieldValue::owned_any(book)))
    })
}

fn update_book(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let id = id_argument(&ctx)?;
        let input = book_input(&ctx)?;
        let book = ctx.data::<BookService>()?.update_book(&id, input).await?;
        Ok(Some(FieldValue::owned_any(book)))
    })
}

fn delete_book(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let id = id_argument(&ctx)?;
        ctx.data::<BookService>()?.delete_book(&id).await?;
        Ok(Some(Value::from(true)))
    })
}

/// `ID` arguments may arrive as strings or integer literals.
fn id_argument(ctx: &ResolverContext<'_>) -> async_graphql::Result<String> {
    match ctx.args.try_get("id")?.as_value() {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(format!("invalid book id: {other}").into()),
    }
}

fn book_input(ctx: &ResolverContext<'_>) -> async_graphql::Result<BookInput> {
    let input = ctx.args.try_get("input")?.object()?;
    Ok(BookInput {
        title: input.try_get("title")?.string()?.to_string(),
        author: input.try_get("author")?.string()?.to_string(),
        year: i32::try_from(input.try_get("year")?.i64()?)?,
    })
}

/// `POST /graphql`
pub async fn graphql_handler(
    State(schema): State<Schema>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(schema.execute(request).await)
}

/// `GET /graphql/schema`
pub async fn schema_sdl(State(schema): State<Schema>) -> String {
    schema.sdl()
}
