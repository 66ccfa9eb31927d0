//! Common CSDL documents for tests.

/// A small sales service: inheritance, a bidirectional navigation with a
/// referential constraint, an enum, a type definition, operations, a
/// container with bindings and a function import, and out-of-line
/// annotations.
pub const SALES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Sales" Alias="S">
      <EntityType Name="Party" Abstract="true">
        <Key>
          <PropertyRef Name="Id"/>
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <Property Name="Name" Type="Edm.String" MaxLength="100"/>
      </EntityType>
      <EntityType Name="Customer" BaseType="S.Party">
        <Property Name="Address" Type="S.Address"/>
        <NavigationProperty Name="Orders" Type="Collection(S.Order)" Partner="Customer"/>
      </EntityType>
      <EntityType Name="Order">
        <Key>
          <PropertyRef Name="OrderId"/>
        </Key>
        <Property Name="OrderId" Type="Edm.Int32" Nullable="false"/>
        <Property Name="CustomerId" Type="Edm.Int32" Nullable="false"/>
        <Property Name="Status" Type="S.OrderStatus" Nullable="false"/>
        <Property Name="Total" Type="S.Money"/>
        <NavigationProperty Name="Customer" Type="S.Customer" Nullable="false" Partner="Orders">
          <ReferentialConstraint Property="CustomerId" ReferencedProperty="Id"/>
          <OnDelete Action="Cascade"/>
        </NavigationProperty>
      </EntityType>
      <ComplexType Name="Address">
        <Property Name="Street" Type="Edm.String"/>
        <Property Name="City" Type="Edm.String"/>
      </ComplexType>
      <EnumType Name="OrderStatus">
        <Member Name="Open" Value="0"/>
        <Member Name="Shipped" Value="1"/>
      </EnumType>
      <TypeDefinition Name="Money" UnderlyingType="Edm.Decimal" Precision="18" Scale="2"/>
      <Term Name="Description" Type="Edm.String"/>
      <Term Name="Priority" Type="Edm.Int32"/>
      <Function Name="TopCustomers">
        <Parameter Name="count" Type="Edm.Int32" Nullable="false"/>
        <ReturnType Type="Collection(S.Customer)"/>
      </Function>
      <Action Name="Ship" IsBound="true">
        <Parameter Name="order" Type="S.Order"/>
      </Action>
      <EntityContainer Name="Default">
        <EntitySet Name="Customers" EntityType="S.Customer">
          <NavigationPropertyBinding Path="Orders" Target="Orders"/>
        </EntitySet>
        <EntitySet Name="Orders" EntityType="S.Order">
          <NavigationPropertyBinding Path="Customer" Target="Customers"/>
        </EntitySet>
        <FunctionImport Name="TopCustomers" Function="S.TopCustomers" EntitySet="Customers"/>
      </EntityContainer>
      <Annotations Target="S.Party">
        <Annotation Term="S.Description" String="Anyone we trade with"/>
      </Annotations>
      <Annotations Target="S.Customer">
        <Annotation Term="S.Priority" Int="1"/>
      </Annotations>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>
"#;

/// A vocabulary declared in its own document, meant to be referenced.
pub const CORE_VOCABULARY: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Org.OData.Core.V1" Alias="Core">
  <Term Name="Description" Type="Edm.String"/>
  <Term Name="Immutable" Type="Edm.Boolean"/>
</Schema>
"#;

/// A schema using the core vocabulary through an `edmx:Reference`.
pub const USES_CORE: &str = r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.01">
  <edmx:Reference Uri="https://example.com/Org.OData.Core.V1.xml">
    <edmx:Include Namespace="Org.OData.Core.V1" Alias="Core"/>
  </edmx:Reference>
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Catalog">
      <ComplexType Name="Product">
        <Property Name="Sku" Type="Edm.String" Nullable="false">
          <Annotation Term="Core.Immutable" Bool="true"/>
        </Property>
        <Annotation Term="Core.Description" String="Something we sell"/>
      </ComplexType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>
"#;

/// A three-type inheritance cycle.
pub const CYCLE: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Loop">
  <ComplexType Name="A" BaseType="Loop.B"/>
  <ComplexType Name="B" BaseType="Loop.C"/>
  <ComplexType Name="C" BaseType="Loop.A"/>
</Schema>
"#;

/// Two overloads of one function.
pub const OVERLOADS: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Math">
  <Function Name="Sum">
    <Parameter Name="a" Type="Edm.Int32"/>
    <ReturnType Type="Edm.Int32"/>
  </Function>
  <Function Name="Sum">
    <Parameter Name="a" Type="Edm.Int32"/>
    <Parameter Name="b" Type="Edm.Int32"/>
    <ReturnType Type="Edm.Int32"/>
    <Annotation Term="Math.Note" String="binary"/>
  </Function>
  <Term Name="Note" Type="Edm.String"/>
</Schema>
"#;

/// First half of a namespace split across two documents.
pub const SHARED_NAMESPACE_A: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Shared">
  <ComplexType Name="Money">
    <Property Name="Amount" Type="Edm.Decimal"/>
  </ComplexType>
</Schema>
"#;

/// Second half of the shared namespace, using the first half.
pub const SHARED_NAMESPACE_B: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Shared">
  <ComplexType Name="Price">
    <Property Name="Value" Type="Shared.Money"/>
  </ComplexType>
</Schema>
"#;

/// Declares `Dup.Foo` as an entity type.
pub const DUPLICATE_A: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Dup">
  <EntityType Name="Foo">
    <Key>
      <PropertyRef Name="Id"/>
    </Key>
    <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
  </EntityType>
</Schema>
"#;

/// Declares `Dup.Foo` again, as a complex type.
pub const DUPLICATE_B: &str = r#"<Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Dup">
  <ComplexType Name="Foo"/>
</Schema>
"#;
